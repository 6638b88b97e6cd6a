//! Crawler module for page fetching and extraction
//!
//! This module contains the per-URL acquisition logic, including:
//! - Target validation and visited tracking
//! - robots.txt compliance and request pacing
//! - Tiered main-content extraction
//! - Link, metadata and image inventory of fetched pages

mod extractor;
mod fetcher;
mod parser;
mod politeness;

pub use extractor::{ExtractionTier, TierOutcome};
pub use fetcher::{build_http_client, download, Downloaded};
pub use parser::extract_links;
pub use politeness::{RateLimiter, VisitedSet};

pub(crate) use fetcher::classify_error;

use crate::config::Config;
use crate::content::{metadata_from_document, ImageAsset, ImageResolver, PageMetadata};
use crate::robots::RobotsCache;
use crate::url::parse_target;
use crate::FetchError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use std::collections::BTreeSet;
use url::Url;

/// Page content produced by the crawler, before relevance analysis
#[derive(Debug, Clone, Serialize)]
pub struct RawRecord {
    /// The URL as requested
    pub url: String,

    /// URL after redirects; relative references are resolved against it
    pub final_url: String,

    /// Cleaned main-content HTML
    pub html: String,

    /// Absolute http(s) links found anywhere on the page
    pub links: BTreeSet<String>,

    /// Images referenced by the main content
    pub images: Vec<ImageAsset>,

    /// Metadata of the full page
    pub metadata: PageMetadata,

    /// The tier that produced `html`
    pub tier: ExtractionTier,

    pub fetched_at: DateTime<Utc>,
}

/// Why a URL was not fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyVisited,
    DisallowedByRobots,
}

/// Result of a fetch that did not fail
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(Box<RawRecord>),
    Skipped(SkipReason),
}

/// Sequential page fetcher
///
/// Owns all per-crawl state: the robots.txt cache, the visited set and the
/// request pacing. A URL is fetched at most once per `Crawler`.
pub struct Crawler {
    client: Client,
    robots: RobotsCache,
    limiter: RateLimiter,
    visited: VisitedSet,
    tiers: Vec<ExtractionTier>,
    images: Option<ImageResolver>,
    min_content_length: usize,
}

impl Crawler {
    /// Creates a crawler with the default tier order
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;

        let images = config
            .images
            .enabled
            .then(|| ImageResolver::new(client.clone(), config.images.max_per_page));

        Ok(Self {
            client,
            robots: RobotsCache::new(config.user_agent.crawler_name.clone()),
            limiter: RateLimiter::new(config.crawler.request_delay()),
            visited: VisitedSet::new(),
            tiers: ExtractionTier::default_order(),
            images,
            min_content_length: config.extraction.min_content_length,
        })
    }

    /// Replaces the extraction tiers, tried in the given order
    pub fn with_tiers(mut self, tiers: Vec<ExtractionTier>) -> Self {
        self.tiers = tiers;
        self
    }

    /// The shared HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Fetches a page and extracts its content
    ///
    /// # Flow
    ///
    /// 1. Validate the URL (no network on failure)
    /// 2. Record it as visited, or skip if it already was
    /// 3. Check robots.txt for its origin
    /// 4. For each tier: wait for the rate limiter, GET, extract
    ///
    /// A network failure on any tier ends the fetch with `NetworkError`;
    /// when every tier comes back empty the result is `ExtractionError`.
    pub async fn fetch(&mut self, raw_url: &str) -> Result<FetchOutcome, FetchError> {
        let url = parse_target(raw_url).map_err(|e| FetchError::Validation {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;

        if !self.visited.insert(url.as_str()) {
            tracing::debug!("Already visited, skipping: {}", url);
            return Ok(FetchOutcome::Skipped(SkipReason::AlreadyVisited));
        }

        if !self.robots.is_allowed(&self.client, &url).await {
            tracing::info!("Disallowed by robots.txt: {}", url);
            return Ok(FetchOutcome::Skipped(SkipReason::DisallowedByRobots));
        }

        for &tier in &self.tiers {
            self.limiter.acquire().await;
            tracing::debug!("Fetching {} with tier {}", url, tier.name());

            let page = download(&self.client, &url).await?;
            if !page.is_html() {
                tracing::debug!(
                    "Tier {} skipped {}: content type '{}' is not HTML",
                    tier.name(),
                    url,
                    page.content_type
                );
                continue;
            }

            match tier.extract(&page.body, &page.final_url, self.min_content_length) {
                TierOutcome::Content(html) => {
                    tracing::debug!("Tier {} extracted content from {}", tier.name(), url);
                    let record = self.build_record(&url, &page, html, tier).await;
                    return Ok(FetchOutcome::Fetched(Box::new(record)));
                }
                TierOutcome::Empty(reason) => {
                    tracing::debug!("Tier {} found nothing on {}: {}", tier.name(), url, reason);
                }
            }
        }

        Err(FetchError::Extraction {
            url: url.to_string(),
            message: "no extraction tier produced content".to_string(),
        })
    }

    async fn build_record(
        &self,
        url: &Url,
        page: &Downloaded,
        html: String,
        tier: ExtractionTier,
    ) -> RawRecord {
        let (links, metadata) = page_inventory(&page.body, &page.final_url);

        let images = match &self.images {
            Some(resolver) => resolver.resolve_images(&html, &page.final_url).await,
            None => Vec::new(),
        };

        RawRecord {
            url: url.to_string(),
            final_url: page.final_url.to_string(),
            html,
            links,
            images,
            metadata,
            tier,
            fetched_at: Utc::now(),
        }
    }
}

/// Links and metadata of the full page, from a single parse
fn page_inventory(body: &str, base_url: &Url) -> (BTreeSet<String>, PageMetadata) {
    let document = Html::parse_document(body);
    (
        parser::links_from_document(&document, base_url),
        metadata_from_document(&document),
    )
}
