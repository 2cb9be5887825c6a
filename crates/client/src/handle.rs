//! The per-file handle mode state machine: `Open-READ`, `Open-WRITE`,
//! `Open-DREAD`, and `Closed`.

use std::sync::atomic::{AtomicBool, Ordering};

use dfs_wire::{DfsError, FileMode, BYTES_PER_CHUNK};

use crate::session::Session;

/// Lifecycle state of a [`FileHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Open in the mode the handle was created with.
    Open,
    /// Closed; every operation now fails with
    /// [`DfsError::Disconnected`].
    Closed,
}

/// A handle to an open file, bound to the mode it was opened in.
///
/// Created by [`Session::open`], destroyed by [`FileHandle::close`] or by
/// the owning session losing its connection.
pub struct FileHandle {
    session: Session,
    filename: String,
    mode: FileMode,
    closed: AtomicBool,
}

impl FileHandle {
    pub(crate) fn new(session: Session, filename: String, mode: FileMode) -> Self {
        Self {
            session,
            filename,
            mode,
            closed: AtomicBool::new(false),
        }
    }

    /// The mode this handle was opened in.
    #[must_use]
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HandleState {
        if self.closed.load(Ordering::SeqCst) {
            HandleState::Closed
        } else {
            HandleState::Open
        }
    }

    fn ensure_open(&self) -> Result<(), DfsError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DfsError::Disconnected)
        } else {
            Ok(())
        }
    }

    /// Reads chunk `idx` into `out`.
    ///
    /// In [`FileMode::Dread`], never fails with
    /// [`DfsError::ChunkUnavailable`]: any coordinator failure falls back
    /// to whatever is on the local slab (possibly stale or zero).
    ///
    /// # Errors
    ///
    /// [`DfsError::Disconnected`] if the handle is closed, or (outside
    /// DREAD) if the session has no live connection.
    /// [`DfsError::ChunkUnavailable`] in READ/WRITE if the latest
    /// version's owners are all offline.
    pub async fn read(&self, idx: u8, out: &mut [u8; BYTES_PER_CHUNK]) -> Result<(), DfsError> {
        self.ensure_open()?;

        if self.mode == FileMode::Dread {
            if let Ok((_, data)) = self.session.read_chunk(&self.filename, idx, self.mode).await {
                self.persist(idx, &data).await?;
                *out = data;
                return Ok(());
            }
            let local_path = self.session.local_path().to_path_buf();
            let name = self.filename.clone();
            let data = tokio::task::spawn_blocking(move || dfs_store::read_chunk(&local_path, &name, idx))
                .await
                .map_err(|_| DfsError::Disconnected)?
                .unwrap_or([0u8; BYTES_PER_CHUNK]);
            *out = data;
            return Ok(());
        }

        let (_, data) = self.session.read_chunk(&self.filename, idx, self.mode).await?;
        self.persist(idx, &data).await?;
        *out = data;
        Ok(())
    }

    /// Writes `bytes` to chunk `idx`.
    ///
    /// The local slab is only updated after the coordinator accepts the
    /// write; a rejected write never touches local state.
    ///
    /// # Errors
    ///
    /// [`DfsError::BadFileMode`] outside [`FileMode::Write`].
    /// [`DfsError::Disconnected`] if the handle is closed or the session
    /// is down. [`DfsError::WriteTimeout`] if the caller no longer holds
    /// the write lock.
    pub async fn write(&self, idx: u8, bytes: &[u8; BYTES_PER_CHUNK]) -> Result<(), DfsError> {
        self.ensure_open()?;
        if self.mode != FileMode::Write {
            return Err(DfsError::BadFileMode);
        }

        self.session.write_chunk(&self.filename, idx).await?;
        self.persist(idx, bytes).await
    }

    async fn persist(&self, idx: u8, data: &[u8; BYTES_PER_CHUNK]) -> Result<(), DfsError> {
        let local_path = self.session.local_path().to_path_buf();
        let name = self.filename.clone();
        let data = *data;
        tokio::task::spawn_blocking(move || dfs_store::write_chunk(&local_path, &name, idx, &data))
            .await
            .map_err(|_| DfsError::Disconnected)??;
        Ok(())
    }

    /// Closes the handle.
    ///
    /// In READ/WRITE mode, notifies the coordinator; in WRITE mode this
    /// releases the write lock if the caller still holds it. Does not
    /// panic on an already-closed or already-disconnected handle.
    ///
    /// # Errors
    ///
    /// Returns [`DfsError::Disconnected`] if the handle was already
    /// closed, or if notifying the coordinator requires a session that
    /// is no longer live (DREAD handles never error here).
    pub async fn close(&self) -> Result<(), DfsError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(DfsError::Disconnected);
        }

        if self.mode == FileMode::Dread {
            return Ok(());
        }

        self.session.close_file(&self.filename, self.mode).await
    }
}
