use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sumi-Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Crawler politeness and network configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between two outbound page requests (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Timeout applied to every outbound request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt agent token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Main-content extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum number of text characters for the readability tier to count as a hit
    #[serde(rename = "min-content-length", default = "default_min_content_length")]
    pub min_content_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_content_length: default_min_content_length(),
        }
    }
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on images downloaded for a single page
    #[serde(rename = "max-per-page", default = "default_max_images_per_page")]
    pub max_per_page: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_per_page: default_max_images_per_page(),
        }
    }
}

/// Relevance analysis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Records scoring below this value are dropped from the output
    #[serde(rename = "relevance-threshold", default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Directory holding all `session_*` directories
    #[serde(rename = "base-directory", default = "default_base_directory")]
    pub base_directory: PathBuf,

    /// Sessions older than this are removed by cleanup
    #[serde(rename = "retention-hours", default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Run an expired-session cleanup alongside every batch
    #[serde(rename = "cleanup-on-start", default = "default_true")]
    pub cleanup_on_start: bool,
}

impl SessionConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours as i64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_directory: default_base_directory(),
            retention_hours: default_retention_hours(),
            cleanup_on_start: true,
        }
    }
}

/// Progress channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    /// Capacity of each client's event queue
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Idle time after which a consumer receives a ping event (milliseconds)
    #[serde(rename = "keepalive-ms", default = "default_keepalive_ms")]
    pub keepalive_ms: u64,
}

impl ProgressConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_millis(self.keepalive_ms)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            keepalive_ms: default_keepalive_ms(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_min_content_length() -> usize {
    100
}

fn default_max_images_per_page() -> usize {
    50
}

fn default_relevance_threshold() -> f64 {
    0.3
}

fn default_base_directory() -> PathBuf {
    PathBuf::from("./data")
}

fn default_retention_hours() -> u64 {
    24
}

fn default_queue_capacity() -> usize {
    100
}

fn default_keepalive_ms() -> u64 {
    15_000
}

fn default_true() -> bool {
    true
}
