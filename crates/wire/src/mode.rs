//! File handle modes.

use serde::{Deserialize, Serialize};

/// The mode a file is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileMode {
    /// Strict-newest read; requires a live session.
    Read,
    /// Exclusive write; requires a live session and the file's write lock.
    Write,
    /// Disconnection-tolerant best-effort read.
    Dread,
}
