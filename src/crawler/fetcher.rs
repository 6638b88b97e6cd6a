//! HTTP fetcher implementation
//!
//! This module handles the HTTP side of the crawler:
//! - Building the shared client with the crawler's user agent string
//! - GET requests for page bodies
//! - Classifying transport and status failures as network errors

use crate::config::UserAgentConfig;
use crate::FetchError;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A successfully downloaded page
#[derive(Debug, Clone)]
pub struct Downloaded {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value (empty if absent)
    pub content_type: String,

    /// Page body content
    pub body: String,
}

impl Downloaded {
    /// Returns true if the Content-Type looks like HTML
    ///
    /// A missing header is treated as HTML.
    pub fn is_html(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        content_type.is_empty()
            || content_type.contains("text/html")
            || content_type.contains("application/xhtml+xml")
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total timeout applied to every request
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_trawl::config::UserAgentConfig;
/// use sumi_trawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiTrawl".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page body
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Ok(Downloaded)` |
/// | Non-2xx status | `NetworkError` naming the status |
/// | Timeout | `NetworkError` "Request timeout" |
/// | Connection failure | `NetworkError` "Connection refused" |
/// | Unreadable body | `NetworkError` |
pub async fn download(client: &Client, url: &Url) -> Result<Downloaded, FetchError> {
    let network_error = |message: String| FetchError::Network {
        url: url.to_string(),
        message,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| network_error(classify_error(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(network_error(format!("HTTP {}", status.as_u16())));
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = response
        .text()
        .await
        .map_err(|e| network_error(classify_error(&e)))?;

    Ok(Downloaded {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Turns a transport error into a short description
pub(crate) fn classify_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    }
}
