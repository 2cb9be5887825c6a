//! The heartbeat pump: a background task that pings the coordinator every
//! `T_HB` and stops itself (and marks the session disconnected) the first
//! time a ping fails.

use dfs_wire::message::{ClientRequest, CoordinatorReply, HeartbeatRequest};
use dfs_wire::T_HB;

use crate::session::Session;

pub(crate) async fn pump(session: Session) {
    loop {
        tokio::time::sleep(T_HB).await;
        if !session.is_connected() {
            return;
        }

        let request = ClientRequest::Heartbeat(HeartbeatRequest {
            identity: session.0.identity,
        });
        match session.control_call(request).await {
            Ok(CoordinatorReply::Heartbeat(reply)) if !reply.identity.is_unset() => {}
            _ => {
                tracing::warn!("heartbeat failed, marking session disconnected");
                session.mark_disconnected();
                return;
            }
        }
    }
}
