//! The liveness monitor (C5): a background task that periodically demotes
//! connected sessions whose last heartbeat is older than `T_TO`, releasing
//! any write lock they held in the same critical section.

use dfs_wire::{T_MON, T_TO};

use crate::Coordinator;

/// Runs the monitor loop until the process exits. Intended to be
/// `tokio::spawn`ed once per coordinator.
pub(crate) async fn run(coordinator: Coordinator) {
    loop {
        tokio::time::sleep(T_MON).await;
        coordinator.sweep_stale_sessions().await;
    }
}

impl Coordinator {
    async fn sweep_stale_sessions(&self) {
        let mut state = self.0.lock().await;
        let stale = state.membership.stale_identities(T_TO);
        for identity in &stale {
            state.membership.mark_disconnected(*identity);
            for file in state.files.values_mut() {
                file.release_lock_if_held_by(*identity);
            }
        }
        drop(state);

        for identity in stale {
            tracing::info!(%identity, "session timed out, demoted to disconnected");
        }
    }
}
