//! Batch pipeline
//!
//! Runs a list of target URLs through fetch, analysis and persistence, one
//! at a time, inside a fresh session directory, publishing progress to the
//! requesting client as it goes.

use crate::analysis::{Analyzer, ContentRecord};
use crate::config::Config;
use crate::crawler::{Crawler, FetchOutcome, SkipReason};
use crate::progress::{EventPayload, LogLevel, ProgressNotifier, ProgressStatus};
use crate::session::{ArtifactKind, CleanupTask, Session, SessionStore, StorageResult};
use crate::{ErrorKind, FetchError, Result, TrawlError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Output of the topic-to-site suggestion step
///
/// `websites` is treated as an unordered list of batch targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteSuggestion {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub websites: Vec<String>,

    #[serde(default)]
    pub context: Option<String>,
}

impl SiteSuggestion {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A target that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub url: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&FetchError> for BatchError {
    fn from(error: &FetchError) -> Self {
        Self {
            url: error.url().to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Counts over one batch
///
/// `successful + failed + skipped + filtered == total`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub filtered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// No target failed
    Completed,

    /// Some, but not all, targets failed
    PartialFailure,

    /// Every target failed
    AllFailed,
}

impl BatchStatus {
    pub fn from_summary(summary: &BatchSummary) -> Self {
        if summary.failed == 0 {
            Self::Completed
        } else if summary.failed == summary.total {
            Self::AllFailed
        } else {
            Self::PartialFailure
        }
    }
}

/// Everything a batch produced
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub session_id: String,
    pub session_path: PathBuf,
    pub records: Vec<ContentRecord>,
    pub errors: Vec<BatchError>,
    pub summary: BatchSummary,
    pub status: BatchStatus,
}

/// Sequential fetch → analyze → persist pipeline
pub struct Pipeline {
    crawler: Crawler,
    analyzer: Analyzer,
    store: SessionStore,
    notifier: Arc<ProgressNotifier>,
    cleanup_on_start: bool,
}

impl Pipeline {
    pub fn new(config: &Config, notifier: Arc<ProgressNotifier>) -> Result<Self> {
        Ok(Self {
            crawler: Crawler::new(config)?,
            analyzer: Analyzer::new(config.analysis.relevance_threshold),
            store: SessionStore::from_config(&config.session),
            notifier,
            cleanup_on_start: config.session.cleanup_on_start,
        })
    }

    /// Replaces the crawler, e.g. to change its extraction tiers
    pub fn with_crawler(mut self, crawler: Crawler) -> Self {
        self.crawler = crawler;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<ProgressNotifier> {
        &self.notifier
    }

    /// Processes `targets` in order and persists the relevant pages
    ///
    /// Per-URL failures are collected into the result. The batch itself only
    /// fails when there are no targets or the session cannot be created.
    /// When cleanup-on-start is enabled, expired sessions are removed
    /// concurrently and the cleanup is awaited before returning.
    pub async fn run_batch(&mut self, targets: &[String], client_id: &str) -> Result<BatchResult> {
        if targets.is_empty() {
            return Err(TrawlError::EmptyBatch);
        }

        let cleanup = self.cleanup_on_start.then(|| self.store.schedule_cleanup());

        let session = match self.store.create_session() {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Failed to create session: {}", e);
                self.notifier.publish(
                    client_id,
                    EventPayload::progress(
                        None,
                        format!("Failed to create session: {}", e),
                        ProgressStatus::Failed,
                    ),
                );
                finish_cleanup(cleanup).await;
                return Err(e.into());
            }
        };

        tracing::info!("Starting batch of {} targets in {}", targets.len(), session.id);
        self.notifier.log(
            client_id,
            LogLevel::Info,
            format!("Started session {} with {} targets", session.id, targets.len()),
        );

        let total = targets.len();
        let mut records = Vec::new();
        let mut errors = Vec::new();
        let mut skipped = 0;
        let mut filtered = 0;
        let mut written_images = HashSet::new();

        for (position, target) in targets.iter().enumerate() {
            self.notifier.publish(
                client_id,
                EventPayload::progress(
                    Some(percent(position, total)),
                    format!("Processing {} ({}/{})", target, position + 1, total),
                    ProgressStatus::Running,
                ),
            );

            let raw = match self.crawler.fetch(target).await {
                Ok(FetchOutcome::Fetched(raw)) => raw,
                Ok(FetchOutcome::Skipped(reason)) => {
                    skipped += 1;
                    let message = match reason {
                        SkipReason::AlreadyVisited => format!("Skipped {}: already visited", target),
                        SkipReason::DisallowedByRobots => {
                            format!("Skipped {}: disallowed by robots.txt", target)
                        }
                    };
                    self.notifier.log(client_id, LogLevel::Info, message);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    self.notifier.log(client_id, LogLevel::Error, e.to_string());
                    errors.push(BatchError::from(&e));
                    continue;
                }
            };

            let Some(record) = self.analyzer.analyze_one(*raw) else {
                filtered += 1;
                self.notifier.log(
                    client_id,
                    LogLevel::Info,
                    format!("Filtered {}: below relevance threshold", target),
                );
                continue;
            };

            let index = records.len() + 1;
            match self.persist_record(&session, index, &record, &mut written_images, client_id) {
                Ok(()) => {
                    self.notifier.log(
                        client_id,
                        LogLevel::Info,
                        format!(
                            "Saved {} (relevance {:.2}, {} images)",
                            record.url,
                            record.relevance_score,
                            record.images.len()
                        ),
                    );
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!("Failed to persist {}: {}", record.url, e);
                    self.notifier.log(client_id, LogLevel::Error, e.to_string());
                    errors.push(BatchError {
                        url: record.url,
                        kind: ErrorKind::Storage,
                        message: e.to_string(),
                    });
                }
            }
        }

        finish_cleanup(cleanup).await;

        let summary = BatchSummary {
            total,
            successful: records.len(),
            failed: errors.len(),
            skipped,
            filtered,
        };
        let status = BatchStatus::from_summary(&summary);

        tracing::info!(
            "Batch complete: {} saved, {} failed, {} skipped, {} filtered",
            summary.successful,
            summary.failed,
            summary.skipped,
            summary.filtered
        );
        self.notifier.publish(
            client_id,
            EventPayload::progress(
                Some(100),
                format!(
                    "Completed: {} of {} pages saved",
                    summary.successful, summary.total
                ),
                ProgressStatus::Complete,
            ),
        );

        Ok(BatchResult {
            session_id: session.id,
            session_path: session.path,
            records,
            errors,
            summary,
            status,
        })
    }

    /// Writes `content_<index>.html`, `content_<index>.txt` and the images
    ///
    /// Images already written in this session (same content hash) are not
    /// written again. A failing image write is logged and skipped.
    fn persist_record(
        &self,
        session: &Session,
        index: usize,
        record: &ContentRecord,
        written_images: &mut HashSet<String>,
        client_id: &str,
    ) -> StorageResult<()> {
        self.store.persist(
            session,
            &format!("content_{}.html", index),
            record.html.as_bytes(),
            ArtifactKind::Html,
        )?;
        self.store.persist(
            session,
            &format!("content_{}.txt", index),
            record.text.as_bytes(),
            ArtifactKind::Text,
        )?;

        for image in &record.images {
            if !written_images.insert(image.filename.clone()) {
                tracing::debug!("Image {} already saved in this session", image.filename);
                continue;
            }

            match self
                .store
                .persist(session, &image.filename, &image.bytes, ArtifactKind::Image)
            {
                Ok(path) => self.notifier.log(
                    client_id,
                    LogLevel::Info,
                    format!("Saved image {}", path.display()),
                ),
                Err(e) => {
                    tracing::warn!("Failed to save image {}: {}", image.absolute_url, e);
                    written_images.remove(&image.filename);
                    self.notifier.log(client_id, LogLevel::Warning, e.to_string());
                }
            }
        }

        Ok(())
    }
}

/// Awaits a background cleanup, logging its outcome
async fn finish_cleanup(task: Option<CleanupTask>) {
    let Some(task) = task else {
        return;
    };

    match task.wait().await {
        Ok(report) => {
            if !report.removed.is_empty() {
                tracing::info!("Removed {} expired sessions", report.removed.len());
            }
            if !report.failed.is_empty() {
                tracing::warn!("Could not remove {} expired sessions", report.failed.len());
            }
        }
        Err(e) => tracing::warn!("Session cleanup failed: {}", e),
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100) / total).min(100) as u8
}
