//! The open/read/write/close protocol (C6, C7): chunk-version resolution,
//! write-lock arbitration, and the registration/heartbeat handlers that
//! drive membership.
//!
//! Every handler here follows the same shape: mutate or inspect [`State`]
//! under the lock just long enough to decide what to do, release it before
//! any reverse-RPC or outbound connect, and re-acquire it only to record
//! the outcome. No handler holds the state guard across an `.await` that
//! crosses the network.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use dfs_wire::message::{
    CheckFileExistsReply, CheckFileExistsRequest, ClientRequest, CloseFileReply, CloseFileRequest,
    CoordinatorReply, DisconnectClientReply, DisconnectClientRequest, HeartbeatReply,
    HeartbeatRequest, OpenFileReply, OpenFileRequest, ReadChunkReply, ReadChunkRequest,
    RegisterClientReply, RegisterClientRequest, ResolvedChunk, WriteChunkReply, WriteChunkRequest,
};
use dfs_wire::{validate_filename, Chunk, ClientIdentity, FileMode};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;

use crate::broker;
use crate::membership::ConnectedSession;
use crate::registry::ChunkVersionEntry;
use crate::Coordinator;

impl Coordinator {
    /// Dispatches a single control-link request to its handler.
    pub(crate) async fn handle_request(&self, request: ClientRequest) -> CoordinatorReply {
        match request {
            ClientRequest::Register(req) => CoordinatorReply::Register(self.handle_register(req).await),
            ClientRequest::Disconnect(req) => {
                CoordinatorReply::Disconnect(self.handle_disconnect(req).await)
            }
            ClientRequest::Heartbeat(req) => {
                CoordinatorReply::Heartbeat(self.handle_heartbeat(req).await)
            }
            ClientRequest::CheckFileExists(req) => {
                CoordinatorReply::CheckFileExists(self.handle_check_file_exists(req).await)
            }
            ClientRequest::OpenFile(req) => CoordinatorReply::OpenFile(self.handle_open_file(req).await),
            ClientRequest::ReadChunk(req) => {
                CoordinatorReply::ReadChunk(self.handle_read_chunk(req).await)
            }
            ClientRequest::WriteChunk(req) => {
                CoordinatorReply::WriteChunk(self.handle_write_chunk(req).await)
            }
            ClientRequest::CloseFile(req) => {
                CoordinatorReply::CloseFile(self.handle_close_file(req).await)
            }
        }
    }

    async fn handle_register(&self, req: RegisterClientRequest) -> RegisterClientReply {
        let identity = {
            let mut state = self.0.lock().await;
            if req.identity.is_unset() {
                state.membership.allocate_identity()
            } else if state.membership.is_known(req.identity) {
                req.identity
            } else {
                // An unknown, non-zero identity (a stale or hand-edited
                // `clientid` cache file) is treated as a fresh
                // registration rather than rejected outright.
                tracing::debug!(identity = %req.identity, "unknown identity presented, assigning fresh one");
                state.membership.allocate_identity()
            }
        };

        let Ok(addr) = req.callback_addr.parse::<SocketAddr>() else {
            tracing::warn!(addr = %req.callback_addr, "malformed reverse-RPC callback address");
            return RegisterClientReply {
                identity: ClientIdentity::UNSET,
            };
        };

        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(%addr, %error, "could not establish reverse-RPC link to client");
                return RegisterClientReply {
                    identity: ClientIdentity::UNSET,
                };
            }
        };

        let session = ConnectedSession {
            callback_addr: req.callback_addr,
            last_heartbeat: Instant::now(),
            reverse: Arc::new(AsyncMutex::new(stream)),
        };

        tracing::info!(%identity, addr = %session.callback_addr, "client registered");
        let mut state = self.0.lock().await;
        state.membership.mark_connected(identity, session);

        RegisterClientReply { identity }
    }

    async fn handle_disconnect(&self, req: DisconnectClientRequest) -> DisconnectClientReply {
        let mut state = self.0.lock().await;
        state.membership.mark_disconnected(req.identity);
        for file in state.files.values_mut() {
            file.release_lock_if_held_by(req.identity);
        }
        tracing::info!(identity = %req.identity, "client disconnected");
        DisconnectClientReply {
            identity: req.identity,
        }
    }

    async fn handle_heartbeat(&self, req: HeartbeatRequest) -> HeartbeatReply {
        let mut state = self.0.lock().await;
        if state.membership.touch_heartbeat(req.identity) {
            HeartbeatReply {
                identity: req.identity,
            }
        } else {
            HeartbeatReply {
                identity: ClientIdentity::UNSET,
            }
        }
    }

    async fn handle_check_file_exists(&self, req: CheckFileExistsRequest) -> CheckFileExistsReply {
        let state = self.0.lock().await;
        CheckFileExistsReply {
            exists: state.files.contains_key(&req.filename),
        }
    }

    async fn handle_open_file(&self, req: OpenFileRequest) -> OpenFileReply {
        if validate_filename(&req.filename).is_err() {
            return OpenFileReply::Unavailable;
        }

        let chunk_indices = {
            let mut state = self.0.lock().await;
            let existed = state.files.contains_key(&req.filename);
            let file = state.files.entry(req.filename.clone()).or_default();

            if !existed {
                if req.mode == FileMode::Write {
                    file.lock_holder = Some(req.identity);
                }
                return OpenFileReply::Success { chunks: Vec::new() };
            }

            if req.mode == FileMode::Write {
                match file.lock_holder {
                    None => file.lock_holder = Some(req.identity),
                    Some(holder) if holder == req.identity => {}
                    Some(_) => return OpenFileReply::Conflict,
                }
            }

            if file.chunks.is_empty() {
                return OpenFileReply::Success { chunks: Vec::new() };
            }

            let mut indices: Vec<u8> = file.chunks.keys().copied().collect();
            indices.sort_unstable();
            indices
        };

        let mut resolved = Vec::with_capacity(chunk_indices.len());
        for idx in chunk_indices {
            if let Some((version, data)) = self.resolve_newest_reachable(&req.filename, idx).await {
                resolved.push(ResolvedChunk { idx, version, data });
            }
        }

        // A WRITE open's primary job is acquiring the lock; overlaying
        // pre-existing chunks onto the writer's local slab is a courtesy
        // that must not block the open when every owner happens to be
        // offline. READ (and DREAD, which never reaches this reply) must
        // still fail outright when nothing is reachable.
        if resolved.is_empty() && req.mode != FileMode::Write {
            return OpenFileReply::Unavailable;
        }

        let mut state = self.0.lock().await;
        if let Some(file) = state.files.get_mut(&req.filename) {
            for chunk in &resolved {
                if let Some(entry) = file.chunks.get_mut(&chunk.idx) {
                    entry.record_owner(chunk.version, req.identity);
                }
            }
        }

        OpenFileReply::Success { chunks: resolved }
    }

    async fn handle_read_chunk(&self, req: ReadChunkRequest) -> ReadChunkReply {
        let resolved = if req.mode == FileMode::Dread {
            self.resolve_newest_reachable(&req.filename, req.idx).await
        } else {
            self.resolve_latest_only(&req.filename, req.idx).await
        };

        let Some((version, data)) = resolved else {
            return ReadChunkReply::Unavailable;
        };

        let mut state = self.0.lock().await;
        if let Some(entry) = state
            .files
            .get_mut(&req.filename)
            .and_then(|file| file.chunks.get_mut(&req.idx))
        {
            entry.record_owner(version, req.identity);
        }

        ReadChunkReply::Success { version, data }
    }

    async fn handle_write_chunk(&self, req: WriteChunkRequest) -> WriteChunkReply {
        let mut state = self.0.lock().await;
        // A write to a file that was never successfully `Open`ed has no
        // `FileEntry` and therefore no lock holder; reject without
        // materializing one, or `CheckFileExists` would start lying.
        let Some(file) = state.files.get_mut(&req.filename) else {
            return WriteChunkReply::Rejected;
        };

        if file.lock_holder != Some(req.identity) {
            return WriteChunkReply::Rejected;
        }

        let version = match file.chunks.get_mut(&req.idx) {
            Some(entry) => entry.record_write(req.identity),
            None => {
                file.chunks.insert(req.idx, ChunkVersionEntry::first_write(req.identity));
                0
            }
        };

        WriteChunkReply::Success { version }
    }

    async fn handle_close_file(&self, req: CloseFileRequest) -> CloseFileReply {
        if req.mode == FileMode::Write {
            let mut state = self.0.lock().await;
            if let Some(file) = state.files.get_mut(&req.filename) {
                file.release_lock_if_held_by(req.identity);
            }
        }
        CloseFileReply { success: true }
    }

    /// Best-effort resolution (used by Open and by DREAD reads): walks
    /// versions from newest to oldest, trying every recorded owner at each
    /// version that is currently connected, until one answers.
    async fn resolve_newest_reachable(&self, filename: &str, idx: u8) -> Option<(u64, Chunk)> {
        let candidates = {
            let state = self.0.lock().await;
            let entry = state.files.get(filename)?.chunks.get(&idx)?;
            let mut versions: Vec<u64> = entry.owners.keys().copied().collect();
            versions.sort_unstable_by(|a, b| b.cmp(a));

            let mut candidates = Vec::new();
            for version in versions {
                let Some(owners) = entry.owners.get(&version) else {
                    continue;
                };
                for owner in owners {
                    if let Some(session) = state.membership.connected.get(owner) {
                        candidates.push((version, *owner, session.reverse.clone()));
                    }
                }
            }
            candidates
        };

        self.try_candidates(filename, idx, candidates).await
    }

    /// Strict resolution (used by READ/WRITE reads): only the owners of
    /// the chunk's current `latest_version` are tried; no fallback to an
    /// older version.
    async fn resolve_latest_only(&self, filename: &str, idx: u8) -> Option<(u64, Chunk)> {
        let candidates = {
            let state = self.0.lock().await;
            let entry = state.files.get(filename)?.chunks.get(&idx)?;
            let version = entry.latest_version;
            let owners = entry.owners.get(&version)?;
            owners
                .iter()
                .filter_map(|owner| {
                    state
                        .membership
                        .connected
                        .get(owner)
                        .map(|session| (version, *owner, session.reverse.clone()))
                })
                .collect::<Vec<_>>()
        };

        self.try_candidates(filename, idx, candidates).await
    }

    async fn try_candidates(
        &self,
        filename: &str,
        idx: u8,
        candidates: Vec<(u64, ClientIdentity, broker::ReverseHandle)>,
    ) -> Option<(u64, Chunk)> {
        for (version, owner, handle) in candidates {
            match broker::fetch_chunk(&handle, filename, idx).await {
                Ok(data) => return Some((version, data)),
                Err(error) => {
                    tracing::debug!(%owner, %version, %error, "fetch_chunk candidate failed");
                }
            }
        }
        None
    }
}
