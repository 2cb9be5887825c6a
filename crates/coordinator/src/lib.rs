#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `dfs_coordinator` is the metadata registry and chunk-fetch broker at
//! the centre of the DFS: it tracks which client holds which version of
//! which chunk, arbitrates the per-file write lock, and brokers best-effort
//! chunk transfers between peers via reverse RPC. It stores no chunk
//! payload bytes of its own.
//!
//! # Design
//!
//! All shared mutable state — the per-file chunk-version registry and the
//! connected/disconnected membership pools — lives behind one
//! `tokio::sync::Mutex<State>`, matching the coarse, coordinator-wide
//! locking discipline the design allows (per-file locking is a documented
//! future optimisation, not implemented here). [`Coordinator`] is a cheap
//! `Arc` handle to that state; every task that observes it — the per-
//! connection request handlers and the liveness monitor — holds its own
//! clone rather than a borrow into a longer-lived value, following the
//! `Arc`-shared daemon session state convention used elsewhere in this
//! workspace.
//!
//! # Invariants
//!
//! - No handler holds the state lock across a reverse-RPC call or an
//!   outbound `TcpStream::connect`; candidates are collected into an owned
//!   `Vec` while the lock is held, then the lock is dropped before any
//!   network call (see [`protocol`]).
//! - A write lock is released in the same critical section that moves its
//!   holder to the disconnected pool (see [`monitor`]).

mod broker;
mod membership;
mod monitor;
mod protocol;
mod registry;
mod server;
mod state;

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

pub use server::run;

use state::State;

/// A cheap, cloneable handle to the coordinator's shared state.
///
/// Cloning a [`Coordinator`] clones the underlying `Arc`; every clone
/// observes the same registry and membership pools.
#[derive(Clone, Default)]
pub struct Coordinator(Arc<AsyncMutex<State>>);

impl Coordinator {
    /// Creates a fresh coordinator with an empty file registry and no
    /// registered clients.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
