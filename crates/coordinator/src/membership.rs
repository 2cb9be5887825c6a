//! Membership and liveness (C5): the connected/disconnected session pools,
//! identity allocation, and the monitor sweep that demotes stale sessions.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use dfs_wire::ClientIdentity;

use crate::broker::ReverseHandle;

/// A connected client's session record: its reverse-RPC handle and the
/// timestamp of its most recent heartbeat.
pub(crate) struct ConnectedSession {
    pub(crate) callback_addr: String,
    pub(crate) last_heartbeat: Instant,
    pub(crate) reverse: ReverseHandle,
}

/// The two disjoint membership pools plus the identity counter, held
/// together because allocation and pool placement are always updated in
/// the same critical section.
#[derive(Default)]
pub(crate) struct Membership {
    pub(crate) connected: HashMap<ClientIdentity, ConnectedSession>,
    pub(crate) disconnected: HashSet<ClientIdentity>,
    next_identity: u64,
}

impl Membership {
    /// Returns `true` if `identity` has been issued before, whether it is
    /// currently connected or disconnected.
    pub(crate) fn is_known(&self, identity: ClientIdentity) -> bool {
        self.connected.contains_key(&identity) || self.disconnected.contains(&identity)
    }

    /// Allocates a fresh identity. Identities start at 1 and are never
    /// reused, even across disconnection.
    pub(crate) fn allocate_identity(&mut self) -> ClientIdentity {
        self.next_identity += 1;
        ClientIdentity(self.next_identity)
    }

    /// Records `identity` as connected with the given session, removing it
    /// from the disconnected pool if it was there (a reconnect).
    pub(crate) fn mark_connected(&mut self, identity: ClientIdentity, session: ConnectedSession) {
        self.disconnected.remove(&identity);
        self.connected.insert(identity, session);
    }

    /// Moves `identity` from connected to disconnected if present. Returns
    /// `true` if a session was actually moved.
    pub(crate) fn mark_disconnected(&mut self, identity: ClientIdentity) -> bool {
        if self.connected.remove(&identity).is_some() {
            self.disconnected.insert(identity);
            true
        } else {
            false
        }
    }

    /// Refreshes the heartbeat timestamp for a connected session. Returns
    /// `false` if `identity` is not currently connected.
    pub(crate) fn touch_heartbeat(&mut self, identity: ClientIdentity) -> bool {
        if let Some(session) = self.connected.get_mut(&identity) {
            session.last_heartbeat = Instant::now();
            true
        } else {
            false
        }
    }

    /// Returns the identities whose last heartbeat is older than `timeout`.
    pub(crate) fn stale_identities(&self, timeout: std::time::Duration) -> Vec<ClientIdentity> {
        let now = Instant::now();
        self.connected
            .iter()
            .filter(|(_, session)| now.duration_since(session.last_heartbeat) > timeout)
            .map(|(identity, _)| *identity)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_never_reused() {
        let mut m = Membership::default();
        let a = m.allocate_identity();
        m.disconnected.insert(a);
        let b = m.allocate_identity();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
    }

    #[test]
    fn reconnect_clears_disconnected_membership() {
        let mut m = Membership::default();
        let id = m.allocate_identity();
        m.disconnected.insert(id);
        assert!(m.is_known(id));
        assert!(!m.connected.contains_key(&id));
    }

    #[test]
    fn stale_identities_is_empty_with_no_sessions() {
        let m = Membership::default();
        assert!(m
            .stale_identities(std::time::Duration::from_secs(0))
            .is_empty());
    }

    #[test]
    fn heartbeat_on_unknown_identity_reports_failure() {
        let mut m = Membership::default();
        assert!(!m.touch_heartbeat(ClientIdentity(42)));
    }
}
