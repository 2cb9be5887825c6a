//! Error taxonomy surfaced to the `dfs-client` library caller.

/// Errors returned by the client library surface.
#[derive(Debug, thiserror::Error)]
pub enum DfsError {
    /// The filename failed validation (must be 1-16 lowercase
    /// alphanumeric characters).
    #[error("bad filename")]
    BadFilename,

    /// The operation requires a live session, but none exists.
    #[error("not connected to the coordinator")]
    Disconnected,

    /// Another client already holds the write lock on this file.
    #[error("another client holds the write lock")]
    OpenWriteConflict,

    /// The file is known to exist but no chunk owner is reachable.
    #[error("file exists but is currently unavailable")]
    FileUnavailable,

    /// The requested chunk's latest version has no reachable owner.
    #[error("chunk is currently unavailable")]
    ChunkUnavailable,

    /// The write was rejected because the caller no longer holds the
    /// write lock, usually due to a stale heartbeat.
    #[error("write lock was lost before the write completed")]
    WriteTimeout,

    /// The requested operation is incompatible with the handle's mode.
    #[error("operation not valid in this file mode")]
    BadFileMode,

    /// A DREAD open was requested for a file with no local slab and no
    /// reachable coordinator copy.
    #[error("file does not exist")]
    FileDoesNotExist,

    /// Local disk I/O failed on the client.
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}
