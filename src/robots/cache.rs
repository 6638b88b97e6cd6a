//! Per-origin robots.txt cache
//!
//! Policies are fetched on first contact with an origin and kept for the
//! lifetime of the owning crawler. There is no expiry.

use crate::robots::{fetch_robots, ParsedRobots};
use crate::url::origin_key;
use reqwest::Client;
use std::collections::HashMap;
use url::Url;

/// Robots.txt policies keyed by origin
#[derive(Debug)]
pub struct RobotsCache {
    /// Product token matched against `User-agent` groups
    user_agent: String,

    /// Parsed policies, keyed by `scheme://host[:port]`
    policies: HashMap<String, ParsedRobots>,
}

impl RobotsCache {
    /// Creates an empty cache matching rules for `user_agent`
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            policies: HashMap::new(),
        }
    }

    /// Checks `url` against its origin's robots.txt, fetching it on first use
    ///
    /// Fetch or parse failures resolve to an allow-all policy, which is then
    /// cached like any other.
    pub async fn is_allowed(&mut self, client: &Client, url: &Url) -> bool {
        let key = origin_key(url);

        if !self.policies.contains_key(&key) {
            tracing::debug!("Fetching robots.txt for origin: {}", key);
            let policy = fetch_robots(client, url).await;
            self.policies.insert(key.clone(), policy);
        } else {
            tracing::trace!("Using cached robots.txt for origin: {}", key);
        }

        self.policies
            .get(&key)
            .map(|policy| policy.is_allowed(url.as_str(), &self.user_agent))
            .unwrap_or(true)
    }

    /// Inserts a policy for an origin, replacing any cached one
    pub fn insert(&mut self, url: &Url, policy: ParsedRobots) {
        self.policies.insert(origin_key(url), policy);
    }

    /// Returns true if a policy for the origin of `url` is cached
    pub fn contains(&self, url: &Url) -> bool {
        self.policies.contains_key(&origin_key(url))
    }

    /// Number of cached origins
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
