//! Filesystem-backed session store

use crate::config::SessionConfig;
use crate::session::{
    list_tree, ArtifactKind, CleanupReport, CleanupTask, Session, StorageError, StorageResult,
    TreeNode,
};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const SESSION_PREFIX: &str = "session_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Length of a formatted `TIMESTAMP_FORMAT` value
const TIMESTAMP_LEN: usize = 15;

/// Upper bound on collision suffixes tried for one timestamp
const MAX_SUFFIX: u32 = 10_000;

/// Creates, fills, lists and expires session directories
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_directory: PathBuf,
    retention: chrono::Duration,
}

impl SessionStore {
    pub fn new(base_directory: impl Into<PathBuf>, retention: chrono::Duration) -> Self {
        Self {
            base_directory: base_directory.into(),
            retention,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.base_directory.clone(), config.retention())
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Creates a new session directory named after the current local time
    pub fn create_session(&self) -> StorageResult<Session> {
        self.create_session_at(Local::now())
    }

    /// Creates a new session directory named after `now`
    ///
    /// If the name is taken, `_1`, `_2`, ... are appended until a free one is
    /// found. Directory creation is the reservation, so two stores racing on
    /// the same base directory never share a session.
    pub fn create_session_at(&self, now: DateTime<Local>) -> StorageResult<Session> {
        fs::create_dir_all(&self.base_directory)
            .map_err(|e| StorageError::io(&self.base_directory, e))?;

        let stem = format!("{}{}", SESSION_PREFIX, now.format(TIMESTAMP_FORMAT));

        for suffix in 0..MAX_SUFFIX {
            let id = if suffix == 0 {
                stem.clone()
            } else {
                format!("{}_{}", stem, suffix)
            };
            let path = self.base_directory.join(&id);

            match fs::create_dir(&path) {
                Ok(()) => {
                    for kind in ArtifactKind::ALL {
                        let dir = path.join(kind.subdirectory());
                        fs::create_dir(&dir).map_err(|e| StorageError::io(&dir, e))?;
                    }
                    tracing::info!("Created session {}", path.display());
                    return Ok(Session {
                        id,
                        path,
                        base_directory: self.base_directory.clone(),
                        created_at: now,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::io(&path, e)),
            }
        }

        Err(StorageError::NamesExhausted(self.base_directory.clone()))
    }

    /// Writes an artifact into the session
    ///
    /// Only the final component of `filename` is used, so an artifact can
    /// never land outside its subdirectory.
    pub fn persist(
        &self,
        session: &Session,
        filename: &str,
        bytes: &[u8],
        kind: ArtifactKind,
    ) -> StorageResult<PathBuf> {
        let name = base_filename(filename)?;
        let path = session.dir(kind).join(name);
        fs::write(&path, bytes).map_err(|e| StorageError::io(&path, e))?;
        tracing::debug!("Saved {}", path.display());
        Ok(path)
    }

    /// Lists the whole base directory
    pub fn list_tree(&self) -> StorageResult<TreeNode> {
        list_tree(&self.base_directory)
    }

    /// Removes sessions older than the retention window
    pub fn cleanup(&self) -> StorageResult<CleanupReport> {
        self.cleanup_at(Local::now())
    }

    /// Removes sessions that are older than the retention window at `now`
    ///
    /// Only `session_*` directories are considered. A directory that cannot
    /// be removed is logged and reported; the pass continues with the rest.
    pub fn cleanup_at(&self, now: DateTime<Local>) -> StorageResult<CleanupReport> {
        let mut report = CleanupReport::default();

        let entries = match fs::read_dir(&self.base_directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(StorageError::io(&self.base_directory, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.base_directory, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();

            if !name.starts_with(SESSION_PREFIX) || !path.is_dir() {
                continue;
            }

            let Some(created_at) = session_created_at(&name, &path) else {
                tracing::warn!("Cannot determine age of {}, leaving it", path.display());
                continue;
            };

            if now.signed_duration_since(created_at) <= self.retention {
                continue;
            }

            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    tracing::info!("Removed expired session {}", name);
                    report.removed.push(name);
                }
                Err(e) => {
                    tracing::warn!("Failed to remove expired session {}: {}", path.display(), e);
                    report.failed.push(name);
                }
            }
        }

        report.removed.sort();
        report.failed.sort();
        Ok(report)
    }

    /// Starts a cleanup pass on the blocking thread pool
    pub fn schedule_cleanup(&self) -> CleanupTask {
        let store = self.clone();
        CleanupTask::new(tokio::task::spawn_blocking(move || store.cleanup()))
    }
}

/// Reduces an artifact name to its final path component
fn base_filename(filename: &str) -> StorageResult<String> {
    let normalized = filename.replace('\\', "/");
    let name = Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if name.is_empty() || name == "." || name == ".." {
        return Err(StorageError::InvalidFilename(filename.to_string()));
    }

    Ok(name.to_string())
}

/// Creation time from the directory name, else from the filesystem
fn session_created_at(name: &str, path: &Path) -> Option<DateTime<Local>> {
    let from_name = name
        .strip_prefix(SESSION_PREFIX)
        .and_then(|rest| rest.get(..TIMESTAMP_LEN))
        .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest());

    from_name.or_else(|| {
        let metadata = fs::metadata(path).ok()?;
        let time = metadata.created().or_else(|_| metadata.modified()).ok()?;
        Some(DateTime::<Local>::from(time))
    })
}
