//! The reverse-RPC listener: serves `FetchChunk` calls issued by the
//! coordinator against this client's own local chunk store.

use std::net::SocketAddr;
use std::path::PathBuf;

use dfs_wire::frame::{read_frame, write_frame};
use dfs_wire::message::{FetchChunkReply, FetchChunkRequest};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Binds a reverse-RPC listener on `bind_addr` (port 0 for an ephemeral
/// port) and spawns its accept loop. Returns the address the coordinator
/// should be told to dial, and a handle to the spawned task.
pub async fn spawn(
    bind_addr: SocketAddr,
    local_path: PathBuf,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr()?;
    let task = tokio::spawn(accept_loop(listener, local_path));
    Ok((actual_addr, task))
}

async fn accept_loop(listener: TcpListener, local_path: PathBuf) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(%error, "reverse-RPC listener accept failed");
                continue;
            }
        };
        tracing::debug!(%peer, "reverse-RPC connection accepted");
        tokio::spawn(serve_connection(stream, local_path.clone()));
    }
}

async fn serve_connection(mut stream: TcpStream, local_path: PathBuf) {
    loop {
        let request: FetchChunkRequest = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(_) => return,
        };
        let path = local_path.clone();
        let reply = tokio::task::spawn_blocking(move || {
            dfs_store::read_chunk(&path, &request.filename, request.idx)
        })
        .await
        .ok()
        .and_then(Result::ok)
        .map_or(FetchChunkReply::NotFound, |data| FetchChunkReply::Success { data });

        if write_frame(&mut stream, &reply).await.is_err() {
            return;
        }
    }
}
