//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! It respects allow/disallow directives before any page is fetched.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::ParsedRobots;

use crate::url::robots_url;
use reqwest::Client;
use url::Url;

/// Fetches and parses robots.txt for the origin of `url`
///
/// The policy fails open: a transport error, a non-2xx status or an
/// unreadable body all produce [`ParsedRobots::allow_all`].
pub async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    let Some(robots) = robots_url(url) else {
        return ParsedRobots::allow_all();
    };

    let response = match client.get(robots.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("robots.txt fetch failed for {}: {}", robots, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "robots.txt at {} returned HTTP {}, allowing all",
            robots,
            response.status().as_u16()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::debug!("robots.txt body unreadable for {}: {}", robots, e);
            ParsedRobots::allow_all()
        }
    }
}
