//! Request pacing and visited-URL tracking
//!
//! The crawler is strictly sequential, so a single global gap between
//! consecutive page requests is enough to keep it polite.

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum gap between consecutive outbound page requests
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between two requests
    delay: Duration,

    /// When the last request was released (None = never)
    last_request_time: Option<Instant>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request_time: None,
        }
    }

    /// Checks if a request may be sent at `now`
    pub fn can_request(&self, now: Instant) -> bool {
        self.time_until_next_request(now).is_none()
    }

    /// Returns how long to wait before the next request, or None if ready
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let ready_at = last + self.delay;
        if now >= ready_at {
            None
        } else {
            Some(ready_at - now)
        }
    }

    /// Records that a request was released at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_time = Some(now);
    }

    /// Waits until the next request is allowed, then records it
    ///
    /// The first request never waits.
    pub async fn acquire(&mut self) {
        if let Some(wait) = self.time_until_next_request(Instant::now()) {
            tracing::trace!("Rate limiter sleeping for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        self.record_request(Instant::now());
    }
}

/// URLs the crawler has already attempted
///
/// A URL is recorded when its fetch starts, so failed fetches count as
/// visited and are not retried within the same crawler.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url`, returning false if it was already present
    pub fn insert(&mut self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
