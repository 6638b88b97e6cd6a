//! Sumi-Trawl: a polite content harvester
//!
//! This crate fetches a batch of candidate pages, extracts their main content,
//! images and metadata, scores the text for relevance and stores the surviving
//! artifacts in a per-run session directory while streaming progress events.

pub mod analysis;
pub mod config;
pub mod content;
pub mod crawler;
pub mod pipeline;
pub mod progress;
pub mod robots;
pub mod session;
pub mod url;

use serde::Serialize;
use thiserror::Error;

/// Main error type for Sumi-Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] session::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("No target URLs provided")]
    EmptyBatch,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Per-URL failure raised while fetching and extracting a page
///
/// These never abort a batch: the pipeline records them next to the URL and
/// moves on to the next target.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    Validation { url: String, reason: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("No content extracted from {url}: {message}")]
    Extraction { url: String, message: String },
}

impl FetchError {
    /// The URL this error belongs to
    pub fn url(&self) -> &str {
        match self {
            Self::Validation { url, .. }
            | Self::Network { url, .. }
            | Self::Extraction { url, .. } => url,
        }
    }

    /// The taxonomy bucket reported in batch results
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Network { .. } => ErrorKind::Network,
            Self::Extraction { .. } => ErrorKind::Extraction,
        }
    }
}

/// Error taxonomy as reported to observers and API consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "PolicyError")]
    Policy,
    #[serde(rename = "NetworkError")]
    Network,
    #[serde(rename = "ExtractionError")]
    Extraction,
    #[serde(rename = "ImageError")]
    Image,
    #[serde(rename = "StorageError")]
    Storage,
}

impl ErrorKind {
    /// Wire name of the error kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Policy => "PolicyError",
            Self::Network => "NetworkError",
            Self::Extraction => "ExtractionError",
            Self::Image => "ImageError",
            Self::Storage => "StorageError",
        }
    }
}

/// Result type alias for Sumi-Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analysis::{score, Analyzer, ContentRecord};
pub use config::Config;
pub use crawler::{Crawler, ExtractionTier, FetchOutcome, RawRecord, SkipReason};
pub use pipeline::{BatchResult, BatchStatus, Pipeline};
pub use progress::{ProgressEvent, ProgressNotifier};
pub use session::{Session, SessionStore};
pub use crate::url::is_valid_url;
