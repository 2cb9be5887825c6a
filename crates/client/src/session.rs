//! The outbound session to the coordinator: connection lifecycle,
//! registration, heartbeats, and the file-level operations that ride on
//! top of the control link.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dfs_wire::frame::{read_frame, write_frame};
use dfs_wire::message::{
    CheckFileExistsRequest, ClientRequest, CloseFileRequest, CoordinatorReply,
    DisconnectClientRequest, OpenFileReply, OpenFileRequest, ReadChunkReply, ReadChunkRequest,
    RegisterClientRequest, ResolvedChunk, WriteChunkReply, WriteChunkRequest,
};
use dfs_wire::{validate_filename, ClientIdentity, DfsError, FileMode};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::handle::FileHandle;
use crate::{heartbeat, identity_cache, reverse};

/// The state shared by every task that observes a session: the control
/// link, connectivity flag, and the background tasks that keep it alive.
/// Held behind one `Arc` and never copied by value into a spawned task.
pub(crate) struct SessionState {
    pub(crate) identity: ClientIdentity,
    pub(crate) local_path: PathBuf,
    control: AsyncMutex<Option<TcpStream>>,
    connected: AtomicBool,
    heartbeat_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    reverse_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// A mounted connection to the DFS coordinator.
///
/// Cloning a [`Session`] clones the `Arc` handle to its shared state; it
/// does not duplicate the underlying connection.
#[derive(Clone)]
pub struct Session(pub(crate) Arc<SessionState>);

impl Session {
    /// Mounts the DFS at `coord_addr`, binding the reverse-RPC listener
    /// to `local_addr` and using `local_path` as the local chunk store
    /// and identity cache.
    ///
    /// Always succeeds if the reverse-RPC listener can bind and
    /// `local_path` can be created, even if the coordinator is
    /// unreachable; in that case the returned session only supports
    /// [`FileMode::Dread`] operations against the local store.
    ///
    /// # Errors
    ///
    /// Returns [`DfsError::Io`] if `local_path` cannot be created or the
    /// reverse-RPC listener cannot bind.
    pub async fn mount(
        coord_addr: SocketAddr,
        local_addr: SocketAddr,
        local_path: impl Into<PathBuf>,
    ) -> Result<Session, DfsError> {
        let local_path = local_path.into();
        std::fs::create_dir_all(&local_path)?;
        let cached_identity = identity_cache::load(&local_path);

        let (reverse_addr, reverse_task) = reverse::spawn(local_addr, local_path.clone()).await?;

        let mut state = SessionState {
            identity: cached_identity,
            local_path: local_path.clone(),
            control: AsyncMutex::new(None),
            connected: AtomicBool::new(false),
            heartbeat_task: std::sync::Mutex::new(None),
            reverse_task: std::sync::Mutex::new(Some(reverse_task)),
        };

        if let Ok(mut stream) = TcpStream::connect(coord_addr).await {
            let register = RegisterClientRequest {
                identity: cached_identity,
                callback_addr: reverse_addr.to_string(),
            };
            let registered = write_frame(&mut stream, &ClientRequest::Register(register))
                .await
                .is_ok();
            let reply = if registered {
                read_frame::<_, CoordinatorReply>(&mut stream).await.ok()
            } else {
                None
            };
            if let Some(CoordinatorReply::Register(reply)) = reply {
                if !reply.identity.is_unset() {
                    identity_cache::save(&local_path, reply.identity)?;
                    state.identity = reply.identity;
                    state.connected = AtomicBool::new(true);
                    state.control = AsyncMutex::new(Some(stream));
                }
            }
        }

        let session = Session(Arc::new(state));
        if session.is_connected() {
            let hb = tokio::spawn(heartbeat::pump(session.clone()));
            *session.0.heartbeat_task.lock().expect("heartbeat task lock") = Some(hb);
        }
        Ok(session)
    }

    /// Cleanly notifies the coordinator, stops the heartbeat pump, and
    /// closes sockets.
    ///
    /// # Errors
    ///
    /// Returns [`DfsError::Disconnected`] if the session was already
    /// disconnected; local cleanup still runs in that case.
    pub async fn unmount(&self) -> Result<(), DfsError> {
        let was_connected = self.0.connected.swap(false, Ordering::SeqCst);

        if was_connected {
            let mut guard = self.0.control.lock().await;
            if let Some(mut stream) = guard.take() {
                let request = ClientRequest::Disconnect(DisconnectClientRequest {
                    identity: self.0.identity,
                });
                let _ = write_frame(&mut stream, &request).await;
            }
        }

        if let Some(task) = self.0.heartbeat_task.lock().expect("heartbeat task lock").take() {
            task.abort();
        }
        if let Some(task) = self.0.reverse_task.lock().expect("reverse task lock").take() {
            task.abort();
        }

        if was_connected {
            Ok(())
        } else {
            Err(DfsError::Disconnected)
        }
    }

    /// Returns whether the session currently believes it has a live
    /// connection to the coordinator.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.0.connected.load(Ordering::SeqCst)
    }

    /// Checks whether a local slab exists for `name`. Never contacts the
    /// coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`DfsError::BadFilename`] if `name` fails validation.
    pub fn local_file_exists(&self, name: &str) -> Result<bool, DfsError> {
        validate_filename(name)?;
        Ok(dfs_store::exists(&self.0.local_path, name))
    }

    /// Asks the coordinator whether `name` has ever existed.
    ///
    /// # Errors
    ///
    /// Returns [`DfsError::BadFilename`] or [`DfsError::Disconnected`].
    pub async fn global_file_exists(&self, name: &str) -> Result<bool, DfsError> {
        validate_filename(name)?;
        let request = ClientRequest::CheckFileExists(CheckFileExistsRequest {
            filename: name.to_string(),
        });
        match self.control_call(request).await? {
            CoordinatorReply::CheckFileExists(reply) => Ok(reply.exists),
            _ => Err(DfsError::Disconnected),
        }
    }

    /// Opens `name` in `mode`.
    ///
    /// # Errors
    ///
    /// See the per-mode rules documented on [`FileHandle`].
    pub async fn open(&self, name: &str, mode: FileMode) -> Result<FileHandle, DfsError> {
        validate_filename(name)?;

        if mode == FileMode::Dread {
            return self.open_dread(name).await;
        }

        if !self.is_connected() {
            return Err(DfsError::Disconnected);
        }

        let request = ClientRequest::OpenFile(OpenFileRequest {
            identity: self.0.identity,
            filename: name.to_string(),
            mode,
        });
        match self.control_call(request).await? {
            CoordinatorReply::OpenFile(OpenFileReply::Success { chunks }) => {
                self.overlay_chunks(name, &chunks).await?;
                Ok(FileHandle::new(self.clone(), name.to_string(), mode))
            }
            CoordinatorReply::OpenFile(OpenFileReply::Conflict) => Err(DfsError::OpenWriteConflict),
            CoordinatorReply::OpenFile(OpenFileReply::Unavailable) => Err(DfsError::FileUnavailable),
            _ => Err(DfsError::Disconnected),
        }
    }

    async fn open_dread(&self, name: &str) -> Result<FileHandle, DfsError> {
        if self.is_connected() {
            let request = ClientRequest::OpenFile(OpenFileRequest {
                identity: self.0.identity,
                filename: name.to_string(),
                mode: FileMode::Dread,
            });
            if let Ok(CoordinatorReply::OpenFile(OpenFileReply::Success { chunks })) =
                self.control_call(request).await
            {
                self.overlay_chunks(name, &chunks).await?;
                return Ok(FileHandle::new(self.clone(), name.to_string(), FileMode::Dread));
            }
        }

        if self.local_file_exists(name)? {
            Ok(FileHandle::new(self.clone(), name.to_string(), FileMode::Dread))
        } else {
            Err(DfsError::FileDoesNotExist)
        }
    }

    async fn overlay_chunks(&self, name: &str, chunks: &[ResolvedChunk]) -> Result<(), DfsError> {
        let local_path = self.0.local_path.clone();
        let name = name.to_string();
        let chunks = chunks.to_vec();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            dfs_store::ensure_zeroed(&local_path, &name)?;
            for chunk in chunks {
                dfs_store::write_chunk(&local_path, &name, chunk.idx, &chunk.data)?;
            }
            Ok(())
        })
        .await
        .map_err(|_| DfsError::Disconnected)??;
        Ok(())
    }

    pub(crate) async fn read_chunk(
        &self,
        name: &str,
        idx: u8,
        mode: FileMode,
    ) -> Result<(u64, [u8; 32]), DfsError> {
        if !self.is_connected() {
            return Err(DfsError::Disconnected);
        }
        let request = ClientRequest::ReadChunk(ReadChunkRequest {
            identity: self.0.identity,
            filename: name.to_string(),
            idx,
            mode,
        });
        match self.control_call(request).await? {
            CoordinatorReply::ReadChunk(ReadChunkReply::Success { version, data }) => {
                Ok((version, data))
            }
            CoordinatorReply::ReadChunk(ReadChunkReply::Unavailable) => {
                Err(DfsError::ChunkUnavailable)
            }
            _ => Err(DfsError::Disconnected),
        }
    }

    pub(crate) async fn write_chunk(&self, name: &str, idx: u8) -> Result<u64, DfsError> {
        if !self.is_connected() {
            return Err(DfsError::Disconnected);
        }
        let request = ClientRequest::WriteChunk(WriteChunkRequest {
            identity: self.0.identity,
            filename: name.to_string(),
            idx,
        });
        match self.control_call(request).await? {
            CoordinatorReply::WriteChunk(WriteChunkReply::Success { version }) => Ok(version),
            CoordinatorReply::WriteChunk(WriteChunkReply::Rejected) => Err(DfsError::WriteTimeout),
            _ => Err(DfsError::Disconnected),
        }
    }

    pub(crate) async fn close_file(&self, name: &str, mode: FileMode) -> Result<(), DfsError> {
        if !self.is_connected() {
            return Err(DfsError::Disconnected);
        }
        let request = ClientRequest::CloseFile(CloseFileRequest {
            identity: self.0.identity,
            filename: name.to_string(),
            mode,
        });
        let _ = self.control_call(request).await;
        Ok(())
    }

    pub(crate) fn local_path(&self) -> &std::path::Path {
        &self.0.local_path
    }

    /// Sends `request` and awaits the matching reply. Any transport
    /// failure marks the session disconnected and is surfaced as
    /// [`DfsError::Disconnected`].
    pub(crate) async fn control_call(
        &self,
        request: ClientRequest,
    ) -> Result<CoordinatorReply, DfsError> {
        let mut guard = self.0.control.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(DfsError::Disconnected);
        };

        let result = async {
            write_frame(stream, &request).await?;
            read_frame::<_, CoordinatorReply>(stream).await
        }
        .await;

        match result {
            Ok(reply) => Ok(reply),
            Err(_) => {
                *guard = None;
                drop(guard);
                self.0.connected.store(false, Ordering::SeqCst);
                Err(DfsError::Disconnected)
            }
        }
    }

    pub(crate) fn mark_disconnected(&self) {
        self.0.connected.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.0.identity)
            .field("connected", &self.is_connected())
            .finish()
    }
}
