//! Caches a client's assigned identity as text under its local path, so
//! the same identity is reused across a restart with the same path.

use std::path::Path;

use dfs_wire::{ClientIdentity, CLIENT_ID_FILE};

/// Loads the cached identity for `local_path`, or [`ClientIdentity::UNSET`]
/// if no cache file exists or it cannot be parsed.
pub fn load(local_path: &Path) -> ClientIdentity {
    std::fs::read_to_string(local_path.join(CLIENT_ID_FILE))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map_or(ClientIdentity::UNSET, ClientIdentity)
}

/// Persists `identity` as text under `local_path`.
pub fn save(local_path: &Path, identity: ClientIdentity) -> std::io::Result<()> {
    std::fs::write(local_path.join(CLIENT_ID_FILE), identity.0.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cache_is_unset() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(dir.path()), ClientIdentity::UNSET);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), ClientIdentity(7)).unwrap();
        assert_eq!(load(dir.path()), ClientIdentity(7));
    }
}
