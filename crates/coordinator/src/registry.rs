//! The chunk-version registry and per-file write lock: `FileEntry`,
//! `ChunkVersionEntry`, and the bookkeeping `Coordinator::handle_*` methods
//! mutate under the single state lock (see [`crate::state`]).

use std::collections::{HashMap, HashSet};

use dfs_wire::ClientIdentity;

/// Per-(file, chunk) version history.
///
/// A chunk that has never been written has no `ChunkVersionEntry` at all;
/// absence is the zero state, not an entry with `latest_version == 0`.
#[derive(Debug, Default)]
pub(crate) struct ChunkVersionEntry {
    /// The newest version assigned to this chunk.
    pub(crate) latest_version: u64,
    /// Owners recorded for each version ever assigned. A version's owner
    /// set only grows; it is never pruned as newer versions arrive.
    pub(crate) owners: HashMap<u64, HashSet<ClientIdentity>>,
}

impl ChunkVersionEntry {
    /// Records the first write to a previously-unwritten chunk, at version
    /// 0, owned solely by `writer`.
    pub(crate) fn first_write(writer: ClientIdentity) -> Self {
        let mut owners = HashMap::new();
        owners.insert(0, HashSet::from([writer]));
        Self {
            latest_version: 0,
            owners,
        }
    }

    /// Bumps `latest_version` by one and records `writer` as the sole
    /// owner of the new version. Returns the newly assigned version.
    pub(crate) fn record_write(&mut self, writer: ClientIdentity) -> u64 {
        self.latest_version += 1;
        self.owners
            .entry(self.latest_version)
            .or_default()
            .insert(writer);
        self.latest_version
    }

    /// Records `owner` as additionally holding a copy of `version`, e.g.
    /// after a successful resolved read or open.
    pub(crate) fn record_owner(&mut self, version: u64, owner: ClientIdentity) {
        self.owners.entry(version).or_default().insert(owner);
    }
}

/// Coordinator-side metadata for one named file: its chunk version history
/// and who, if anyone, holds the exclusive write lock.
#[derive(Debug, Default)]
pub(crate) struct FileEntry {
    pub(crate) chunks: HashMap<u8, ChunkVersionEntry>,
    pub(crate) lock_holder: Option<ClientIdentity>,
}

impl FileEntry {
    /// Releases the write lock if `identity` currently holds it. No-op
    /// otherwise.
    pub(crate) fn release_lock_if_held_by(&mut self, identity: ClientIdentity) {
        if self.lock_holder == Some(identity) {
            self.lock_holder = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_starts_at_version_zero() {
        let entry = ChunkVersionEntry::first_write(ClientIdentity(1));
        assert_eq!(entry.latest_version, 0);
        assert_eq!(entry.owners[&0], HashSet::from([ClientIdentity(1)]));
    }

    #[test]
    fn record_write_increments_and_resets_owners() {
        let mut entry = ChunkVersionEntry::first_write(ClientIdentity(1));
        let v = entry.record_write(ClientIdentity(2));
        assert_eq!(v, 1);
        assert_eq!(entry.owners[&1], HashSet::from([ClientIdentity(2)]));
        // The version-0 owner record is retained, not pruned.
        assert_eq!(entry.owners[&0], HashSet::from([ClientIdentity(1)]));
    }

    #[test]
    fn release_lock_only_affects_current_holder() {
        let mut file = FileEntry {
            lock_holder: Some(ClientIdentity(1)),
            ..Default::default()
        };
        file.release_lock_if_held_by(ClientIdentity(2));
        assert_eq!(file.lock_holder, Some(ClientIdentity(1)));
        file.release_lock_if_held_by(ClientIdentity(1));
        assert_eq!(file.lock_holder, None);
    }
}
