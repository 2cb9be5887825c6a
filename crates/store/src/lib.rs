#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `dfs_store` is the client-side local chunk slab: a fixed 8 KiB
//! zero-initialised file per DFS file, addressed by chunk index. It has
//! no knowledge of sessions, modes, or the network; it is exactly the
//! on-disk counterpart of the original `dfslib` disk operations, ported
//! from seek-and-read-at-offset to typed chunk indices.
//!
//! # Design
//!
//! Every operation is synchronous `std::fs` I/O. Callers running on a
//! `tokio` runtime should wrap calls in `tokio::task::spawn_blocking` to
//! avoid stalling the executor, the same way the async workspace this
//! crate was adapted from keeps blocking disk work off its reactor
//! threads.
//!
//! # Invariants
//!
//! - [`write_chunk`] does not return until the written bytes are durable
//!   (`sync_data`), matching the original's write-then-`Sync()` pattern.
//! - A file's on-disk size is always exactly
//!   [`dfs_wire::FILE_SIZE_BYTES`] once [`ensure_zeroed`] has run.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use dfs_wire::{Chunk, BYTES_PER_CHUNK, FILE_EXTENSION, FILE_SIZE_BYTES};

/// Returns the on-disk path for `name` under `local_path`.
#[must_use]
pub fn slab_path(local_path: &Path, name: &str) -> PathBuf {
    local_path.join(format!("{name}.{FILE_EXTENSION}"))
}

/// Returns `true` if a local slab exists for `name` under `local_path`.
#[must_use]
pub fn exists(local_path: &Path, name: &str) -> bool {
    slab_path(local_path, name).is_file()
}

/// Creates a zero-filled slab for `name` under `local_path` if one does
/// not already exist. No-op if the file is already present.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be created or written.
pub fn ensure_zeroed(local_path: &Path, name: &str) -> std::io::Result<()> {
    let path = slab_path(local_path, name);
    if path.is_file() {
        return Ok(());
    }
    let mut file = File::create(&path)?;
    file.write_all(&vec![0u8; FILE_SIZE_BYTES as usize])?;
    file.sync_data()?;
    Ok(())
}

fn byte_offset(idx: u8) -> u64 {
    u64::from(idx) * BYTES_PER_CHUNK as u64
}

/// Reads chunk `idx` of `name` under `local_path`.
///
/// # Errors
///
/// Returns an I/O error if the file is missing or a short read occurs.
pub fn read_chunk(local_path: &Path, name: &str, idx: u8) -> std::io::Result<Chunk> {
    let mut file = File::open(slab_path(local_path, name))?;
    file.seek(SeekFrom::Start(byte_offset(idx)))?;
    let mut buf = [0u8; BYTES_PER_CHUNK];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Writes `data` to chunk `idx` of `name` under `local_path`, creating a
/// zero-filled slab first if one does not yet exist, and flushing to
/// durable storage before returning.
///
/// # Errors
///
/// Returns an I/O error if the write or flush fails.
pub fn write_chunk(local_path: &Path, name: &str, idx: u8, data: &Chunk) -> std::io::Result<()> {
    ensure_zeroed(local_path, name)?;
    let mut file = OpenOptions::new().write(true).open(slab_path(local_path, name))?;
    file.seek(SeekFrom::Start(byte_offset(idx)))?;
    file.write_all(data)?;
    file.sync_data()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_zeroed_creates_full_size_slab() {
        let dir = tempfile::tempdir().unwrap();
        ensure_zeroed(dir.path(), "cpsc416").unwrap();
        let meta = std::fs::metadata(slab_path(dir.path(), "cpsc416")).unwrap();
        assert_eq!(meta.len(), FILE_SIZE_BYTES);
    }

    #[test]
    fn ensure_zeroed_is_a_noop_when_present() {
        let dir = tempfile::tempdir().unwrap();
        ensure_zeroed(dir.path(), "cpsc416").unwrap();
        write_chunk(dir.path(), "cpsc416", 3, &[7u8; 32]).unwrap();
        ensure_zeroed(dir.path(), "cpsc416").unwrap();
        let data = read_chunk(dir.path(), "cpsc416", 3).unwrap();
        assert_eq!(data, [7u8; 32]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut payload = [0u8; 32];
        payload[..13].copy_from_slice(b"Hello friends");
        write_chunk(dir.path(), "cpsc416", 0, &payload).unwrap();
        let got = read_chunk(dir.path(), "cpsc416", 0).unwrap();
        assert_eq!(got, payload);
    }

    #[test]
    fn unwritten_chunks_read_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        ensure_zeroed(dir.path(), "cpsc416").unwrap();
        let data = read_chunk(dir.path(), "cpsc416", 243).unwrap();
        assert_eq!(data, [0u8; 32]);
    }

    #[test]
    fn read_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_chunk(dir.path(), "ghost", 0).is_err());
    }
}
