//! The coordinator's single piece of shared mutable state: the file
//! registry and the membership pools, behind one `tokio::sync::Mutex`.
//!
//! Every handler that inspects or mutates this state runs to completion
//! without yielding except for reverse-RPC calls, which are always made
//! with an owned copy of the candidate list collected while the lock was
//! held — never while holding the guard itself. A coarse, coordinator-wide
//! lock is the baseline correctness model here; per-file locking is a
//! documented future optimisation, not implemented.

use std::collections::HashMap;

use crate::membership::Membership;
use crate::registry::FileEntry;

#[derive(Default)]
pub(crate) struct State {
    pub(crate) files: HashMap<String, FileEntry>,
    pub(crate) membership: Membership,
}
