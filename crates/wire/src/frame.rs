//! Length-prefixed `bincode` framing shared by the control link and the
//! reverse-RPC link.
//!
//! Each frame is a 4-byte big-endian length prefix followed by that many
//! bytes of `bincode`-encoded payload. One logical stream per direction
//! per peer is enough for this system; there is no multiplexing layer.

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are rejected outright; the wire protocol only
/// ever carries one chunk's worth of metadata plus a small envelope, so
/// anything past a few kilobytes indicates a corrupt or hostile peer.
pub const MAX_FRAME_LEN: u32 = 1 << 16;

/// Error returned by [`read_frame`] or [`write_frame`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The peer closed the connection or the transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The declared frame length exceeds [`MAX_FRAME_LEN`].
    #[error("frame length {0} exceeds maximum {MAX_FRAME_LEN}")]
    TooLarge(u32),

    /// The frame payload failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] bincode::Error),
}

/// Writes `value` as a single length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(value)?;
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge(u32::MAX))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads a single length-prefixed frame and decodes it as `T`.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(bincode::deserialize(&payload)?)
}
