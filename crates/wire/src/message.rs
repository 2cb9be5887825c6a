//! Request/reply message shapes for the control link (client ->
//! coordinator) and the reverse link (coordinator -> client).
//!
//! Every control-link request is wrapped in [`ClientRequest`] and every
//! reply in [`CoordinatorReply`] so a single framed stream can multiplex
//! the handful of operation kinds without a separate connection per
//! operation. The reverse link carries exactly one operation,
//! [`FetchChunkRequest`], but is still wrapped in an envelope for
//! symmetry with the control link's framing code.

use serde::{Deserialize, Serialize};

use crate::identity::ClientIdentity;
use crate::mode::FileMode;
use crate::Chunk;

/// A chunk resolved by the coordinator and returned to a caller, tagged
/// with the version it was resolved at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedChunk {
    /// Index of the chunk within the file.
    pub idx: u8,
    /// Version the returned bytes were resolved at.
    pub version: u64,
    /// The chunk payload.
    pub data: Chunk,
}

/// Registers a client with the coordinator, or re-establishes a session
/// for a previously assigned identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterClientRequest {
    /// The client's cached identity, or [`ClientIdentity::UNSET`] if this
    /// client has never registered.
    pub identity: ClientIdentity,
    /// Address the coordinator should dial back for reverse RPCs.
    pub callback_addr: String,
}

/// Reply to [`RegisterClientRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterClientReply {
    /// The identity assigned (fresh, on first registration) or confirmed
    /// (on reconnect). [`ClientIdentity::UNSET`] indicates registration
    /// failed.
    pub identity: ClientIdentity,
}

/// Notifies the coordinator of a clean client-initiated disconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectClientRequest {
    /// Identity of the disconnecting client.
    pub identity: ClientIdentity,
}

/// Reply to [`DisconnectClientRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectClientReply {
    /// Echoes the identity that was disconnected.
    pub identity: ClientIdentity,
}

/// A liveness ping sent by a client every `T_HB`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    /// Sending client's identity.
    pub identity: ClientIdentity,
}

/// Reply to [`HeartbeatRequest`]: the identity echoed back on success, or
/// [`ClientIdentity::UNSET`] if the coordinator no longer recognizes the
/// session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatReply {
    /// Echoed identity, or the unset sentinel on failure.
    pub identity: ClientIdentity,
}

/// Asks the coordinator whether a file has ever existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFileExistsRequest {
    /// Filename to check.
    pub filename: String,
}

/// Reply to [`CheckFileExistsRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFileExistsReply {
    /// Whether the coordinator has ever seen this filename.
    pub exists: bool,
}

/// Opens a file in the given mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenFileRequest {
    /// Requesting client's identity.
    pub identity: ClientIdentity,
    /// Filename to open.
    pub filename: String,
    /// Requested mode.
    pub mode: FileMode,
}

/// Reply to [`OpenFileRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OpenFileReply {
    /// The open succeeded. Carries every chunk the coordinator was able
    /// to resolve; chunks never written are simply absent.
    Success {
        /// Resolved chunks, tagged with the version each was resolved
        /// at.
        chunks: Vec<ResolvedChunk>,
    },
    /// WRITE-mode open while another client holds the lock.
    Conflict,
    /// The file is known but no chunk owner was reachable for at least
    /// one registered chunk.
    Unavailable,
}

/// Reads a single chunk at its latest reachable version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadChunkRequest {
    /// Requesting client's identity.
    pub identity: ClientIdentity,
    /// Filename the chunk belongs to.
    pub filename: String,
    /// Chunk index to read.
    pub idx: u8,
    /// Mode the caller's handle is open in.
    pub mode: FileMode,
}

/// Reply to [`ReadChunkRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReadChunkReply {
    /// The chunk was resolved.
    Success {
        /// Version the bytes were resolved at.
        version: u64,
        /// The chunk payload.
        data: Chunk,
    },
    /// The latest version's owners are all offline.
    Unavailable,
}

/// Records a write, without carrying payload bytes; the coordinator
/// fetches the bytes back from the writer later via [`FetchChunkRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteChunkRequest {
    /// Writing client's identity.
    pub identity: ClientIdentity,
    /// Filename the chunk belongs to.
    pub filename: String,
    /// Chunk index being written.
    pub idx: u8,
}

/// Reply to [`WriteChunkRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WriteChunkReply {
    /// The write was recorded at the given new version.
    Success {
        /// The version assigned to this write.
        version: u64,
    },
    /// The caller no longer holds the write lock.
    Rejected,
}

/// Closes an open file handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseFileRequest {
    /// Closing client's identity.
    pub identity: ClientIdentity,
    /// Filename being closed.
    pub filename: String,
    /// Mode the handle was open in.
    pub mode: FileMode,
}

/// Reply to [`CloseFileRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseFileReply {
    /// Whether the close was accepted (always true unless the session
    /// was already gone).
    pub success: bool,
}

/// Reverse-RPC call issued by the coordinator to a client, asking it to
/// read a chunk from its own local slab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchChunkRequest {
    /// Filename to read from.
    pub filename: String,
    /// Chunk index to read.
    pub idx: u8,
}

/// Reply to [`FetchChunkRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FetchChunkReply {
    /// The chunk was read successfully.
    Success {
        /// The chunk payload.
        data: Chunk,
    },
    /// The client could not read the chunk locally (missing file or I/O
    /// error).
    NotFound,
}

/// Envelope for every request a client sends on the control link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientRequest {
    /// See [`RegisterClientRequest`].
    Register(RegisterClientRequest),
    /// See [`DisconnectClientRequest`].
    Disconnect(DisconnectClientRequest),
    /// See [`HeartbeatRequest`].
    Heartbeat(HeartbeatRequest),
    /// See [`CheckFileExistsRequest`].
    CheckFileExists(CheckFileExistsRequest),
    /// See [`OpenFileRequest`].
    OpenFile(OpenFileRequest),
    /// See [`ReadChunkRequest`].
    ReadChunk(ReadChunkRequest),
    /// See [`WriteChunkRequest`].
    WriteChunk(WriteChunkRequest),
    /// See [`CloseFileRequest`].
    CloseFile(CloseFileRequest),
}

/// Envelope for every reply the coordinator sends on the control link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoordinatorReply {
    /// See [`RegisterClientReply`].
    Register(RegisterClientReply),
    /// See [`DisconnectClientReply`].
    Disconnect(DisconnectClientReply),
    /// See [`HeartbeatReply`].
    Heartbeat(HeartbeatReply),
    /// See [`CheckFileExistsReply`].
    CheckFileExists(CheckFileExistsReply),
    /// See [`OpenFileReply`].
    OpenFile(OpenFileReply),
    /// See [`ReadChunkReply`].
    ReadChunk(ReadChunkReply),
    /// See [`WriteChunkReply`].
    WriteChunk(WriteChunkReply),
    /// See [`CloseFileReply`].
    CloseFile(CloseFileReply),
}
