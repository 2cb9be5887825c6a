#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `dfs_client` is the library a host application links against to join
//! the DFS: it owns the outbound session to the coordinator, the
//! heartbeat pump, the reverse-RPC listener that serves `FetchChunk`, and
//! the per-file handle mode state machine. `dfs-client-cli` is a thin
//! demonstration binary built on this crate.
//!
//! # Design
//!
//! All mutable session state lives behind one `Arc<SessionState>`;
//! [`Session`] is a cheap handle clone of that `Arc`, and the heartbeat
//! and reverse-listener tasks each hold their own clone rather than a
//! reference into a borrowed session, following the convention of
//! `Arc`-shared daemon session state used elsewhere in this workspace.
//!
//! # Invariants
//!
//! - A [`FileHandle`] in the `Closed` state rejects every further
//!   operation with [`dfs_wire::DfsError::Disconnected`].
//! - A writer never updates its local slab on a rejected write; see
//!   [`FileHandle::write`].
//! - DREAD reads never return [`dfs_wire::DfsError::ChunkUnavailable`].

mod handle;
mod heartbeat;
mod identity_cache;
mod reverse;
mod session;

pub use handle::{FileHandle, HandleState};
pub use session::Session;
