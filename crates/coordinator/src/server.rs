//! The control-link listener: one task per inbound client connection,
//! dispatching each frame through [`Coordinator::handle_request`].

use std::net::SocketAddr;

use dfs_wire::frame::{read_frame, write_frame};
use dfs_wire::message::ClientRequest;
use tokio::net::{TcpListener, TcpStream};

use crate::{monitor, Coordinator};

/// Binds the control-link listener on `addr` and serves connections until
/// the process is signalled to stop. Spawns the liveness monitor
/// alongside the accept loop.
///
/// # Errors
///
/// Returns an I/O error if `addr` cannot be bound.
pub async fn run(addr: SocketAddr, coordinator: Coordinator) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "coordinator listening");

    tokio::spawn(monitor::run(coordinator.clone()));

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "control-link connection accepted");
        tokio::spawn(serve_connection(stream, coordinator.clone()));
    }
}

async fn serve_connection(mut stream: TcpStream, coordinator: Coordinator) {
    loop {
        let request: ClientRequest = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!(%error, "control-link connection closed");
                return;
            }
        };

        let reply = coordinator.handle_request(request).await;

        if let Err(error) = write_frame(&mut stream, &reply).await {
            tracing::debug!(%error, "failed to reply on control link");
            return;
        }
    }
}
