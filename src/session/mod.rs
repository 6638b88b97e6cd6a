//! Session store for batch artifacts
//!
//! Every batch writes into its own `session_<YYYYMMDD_HHMMSS>` directory under
//! the configured base directory:
//!
//! ```text
//! data/
//! └── session_20240101_120000/
//!     ├── html/     content_1.html, ...
//!     ├── text/     content_1.txt, ...
//!     └── images/   image_<hash>.<ext>, ...
//! ```
//!
//! Sessions older than the retention window are removed by
//! [`SessionStore::cleanup`], usually through a [`CleanupTask`] that runs
//! alongside a batch.

mod store;
mod tree;

pub use store::SessionStore;
pub use tree::{list_tree, NodeType, TreeNode};

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors that can occur during session storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact filename: {0:?}")]
    InvalidFilename(String),

    #[error("No free session directory name under {}", .0.display())]
    NamesExhausted(PathBuf),

    #[error("Cleanup task failed: {0}")]
    Task(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The kind of artifact being persisted, which picks its subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Html,
    Text,
    Image,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Html, ArtifactKind::Text, ArtifactKind::Image];

    /// Name of the session subdirectory holding this kind
    pub fn subdirectory(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
            Self::Image => "images",
        }
    }
}

/// A created session directory
///
/// A `Session` is only handed out once all three subdirectories exist.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Directory name, e.g. `session_20240101_120000_1`
    pub id: String,

    /// Full path of the session directory
    pub path: PathBuf,

    pub base_directory: PathBuf,
    pub created_at: DateTime<Local>,
}

impl Session {
    /// Directory holding artifacts of `kind`
    pub fn dir(&self, kind: ArtifactKind) -> PathBuf {
        self.path.join(kind.subdirectory())
    }
}

/// Outcome of a cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Session directories removed
    pub removed: Vec<String>,

    /// Expired session directories that could not be removed
    pub failed: Vec<String>,
}

/// A cleanup pass running on the blocking pool
///
/// The owner awaits it with [`CleanupTask::wait`]; dropping it detaches the
/// task without cancelling it.
#[derive(Debug)]
pub struct CleanupTask {
    handle: JoinHandle<StorageResult<CleanupReport>>,
}

impl CleanupTask {
    pub(crate) fn new(handle: JoinHandle<StorageResult<CleanupReport>>) -> Self {
        Self { handle }
    }

    /// Waits for the cleanup pass to finish
    pub async fn wait(self) -> StorageResult<CleanupReport> {
        self.handle
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}
