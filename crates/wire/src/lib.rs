#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `dfs_wire` holds everything the client and coordinator must agree on
//! without depending on each other: chunk and file sizing constants, the
//! request/reply message shapes exchanged over the control link and the
//! reverse-RPC callback, client identity, filename validation, and the
//! error taxonomy surfaced to library callers.
//!
//! # Design
//!
//! Messages are plain `serde`-derived structs and enums; [`frame`] carries
//! them over a `tokio::net::TcpStream` as length-prefixed `bincode` frames,
//! one logical stream per direction per peer. Nothing in this crate talks
//! to a socket directly beyond that framing helper — connection setup,
//! retry, and timeout policy live in `dfs-client` and `dfs-coordinator`.
//!
//! # Invariants
//!
//! - [`ClientIdentity::UNSET`] is never assigned to a real session.
//! - A [`Chunk`] is always exactly [`BYTES_PER_CHUNK`] bytes; the type
//!   system enforces this via a fixed-size array rather than a `Vec`.
//! - [`validate_filename`] is the single gate filenames pass through on
//!   both sides of the wire; nothing downstream re-validates.

pub mod error;
pub mod frame;
pub mod identity;
pub mod message;
pub mod mode;

pub use error::DfsError;
pub use identity::ClientIdentity;
pub use mode::FileMode;

/// Number of chunks that make up a file.
pub const CHUNKS_PER_FILE: usize = 256;

/// Size in bytes of a single chunk.
pub const BYTES_PER_CHUNK: usize = 32;

/// Total size in bytes of a file's on-disk slab (`CHUNKS_PER_FILE *
/// BYTES_PER_CHUNK`).
pub const FILE_SIZE_BYTES: u64 = (CHUNKS_PER_FILE * BYTES_PER_CHUNK) as u64;

/// Extension given to a file's on-disk slab, matching the original
/// `dfslib` layout.
pub const FILE_EXTENSION: &str = "dfs";

/// Name of the file under a client's local path that caches its assigned
/// identity across restarts.
pub const CLIENT_ID_FILE: &str = "clientid";

/// Heartbeat send period.
pub const T_HB: std::time::Duration = std::time::Duration::from_secs(2);

/// Monitor sweep period on the coordinator.
pub const T_MON: std::time::Duration = std::time::Duration::from_secs(2);

/// Heartbeat staleness threshold; a session older than this is demoted to
/// disconnected.
pub const T_TO: std::time::Duration = std::time::Duration::from_millis(2500);

/// A single fixed-size chunk payload.
pub type Chunk = [u8; BYTES_PER_CHUNK];

/// Maximum filename length, in characters.
pub const MAX_FILENAME_LEN: usize = 16;

/// Validates a filename against the DFS naming rule: 1-16 characters,
/// lowercase ASCII letters and digits only.
///
/// # Errors
///
/// Returns [`DfsError::BadFilename`] if the name is empty, too long, or
/// contains any character outside `[a-z0-9]`.
pub fn validate_filename(name: &str) -> Result<(), DfsError> {
    let ok = !name.is_empty()
        && name.len() <= MAX_FILENAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(DfsError::BadFilename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(validate_filename("cpsc416").is_ok());
        assert!(validate_filename("a").is_ok());
        assert!(validate_filename("0123456789abcdef").is_ok());
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename("0123456789abcdefg").is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(validate_filename("invalid file;").is_err());
        assert!(validate_filename("Upper").is_err());
        assert!(validate_filename("under_score").is_err());
    }
}
