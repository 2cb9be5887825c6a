//! The reverse-RPC broker (C8): the coordinator's outbound call to a
//! connected client's `FetchChunk` endpoint.
//!
//! Each connected client's reverse handle is a single owned `TcpStream`
//! wrapped in an `Arc<tokio::sync::Mutex<_>>`, established once at
//! registration time and reused for every subsequent fetch; per the design
//! notes, this link is owned entirely by the coordinator side and shares no
//! state with the client's own outbound handle.

use std::sync::Arc;

use dfs_wire::frame::{read_frame, write_frame, FrameError};
use dfs_wire::message::{FetchChunkReply, FetchChunkRequest};
use dfs_wire::Chunk;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;

/// A coordinator-owned handle to a connected client's reverse-RPC
/// endpoint.
pub(crate) type ReverseHandle = Arc<AsyncMutex<TcpStream>>;

/// Error returned by [`fetch_chunk`].
#[derive(Debug, thiserror::Error)]
pub(crate) enum BrokerError {
    /// The reverse-RPC transport failed.
    #[error("reverse-RPC transport error: {0}")]
    Transport(#[from] FrameError),

    /// The client could not read the chunk from its own local slab.
    #[error("owner reported chunk not found")]
    NotFound,
}

/// Issues `FetchChunk(filename, idx)` to `handle` and returns the chunk
/// bytes on success.
pub(crate) async fn fetch_chunk(
    handle: &ReverseHandle,
    filename: &str,
    idx: u8,
) -> Result<Chunk, BrokerError> {
    let mut stream = handle.lock().await;
    let request = FetchChunkRequest {
        filename: filename.to_string(),
        idx,
    };
    write_frame(&mut *stream, &request).await?;
    match read_frame::<_, FetchChunkReply>(&mut *stream).await? {
        FetchChunkReply::Success { data } => Ok(data),
        FetchChunkReply::NotFound => Err(BrokerError::NotFound),
    }
}
