//! Relevance analysis of extracted content
//!
//! The relevance score is the mean term weight of a single-document TF-IDF
//! vector: term frequencies, L2 normalized, averaged over the vocabulary. With
//! one document every smoothed idf is 1, so only the frequencies matter.

use crate::content::{html_to_text, ImageAsset, PageMetadata};
use crate::crawler::{ExtractionTier, RawRecord};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token regex is valid"))
}

/// Scores `text` for relevance
///
/// Tokens are lowercased unicode words of at least two characters. Returns
/// 0.0 for text without tokens; the result is always within `[0, 1]`.
///
/// # Example
///
/// ```
/// use sumi_trawl::score;
///
/// assert_eq!(score(""), 0.0);
/// assert!((score("hello") - 1.0).abs() < 1e-9);
/// assert!((score("hello world") - 0.5_f64.sqrt()).abs() < 1e-9);
/// ```
pub fn score(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let mut counts: HashMap<&str, f64> = HashMap::new();
    for token in token_re().find_iter(&lowered) {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }

    if counts.is_empty() {
        return 0.0;
    }

    let total: f64 = counts.values().sum();
    let norm = counts.values().map(|c| c * c).sum::<f64>().sqrt();
    let value = total / (norm * counts.len() as f64);

    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// A page that passed relevance analysis
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord {
    pub url: String,
    pub final_url: String,

    /// Cleaned main-content HTML
    pub html: String,

    /// Plain text of `html`
    pub text: String,

    pub links: BTreeSet<String>,
    pub images: Vec<ImageAsset>,
    pub metadata: PageMetadata,
    pub relevance_score: f64,
    pub tier: ExtractionTier,
    pub fetched_at: DateTime<Utc>,
}

/// Scores raw records and keeps the relevant ones
#[derive(Debug, Clone)]
pub struct Analyzer {
    threshold: f64,
}

impl Analyzer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Analyzes a batch, dropping records that score below the threshold
    pub fn analyze(&self, records: Vec<RawRecord>) -> Vec<ContentRecord> {
        records
            .into_iter()
            .filter_map(|raw| self.analyze_one(raw))
            .collect()
    }

    /// Analyzes one record; None when it scores below the threshold
    pub fn analyze_one(&self, raw: RawRecord) -> Option<ContentRecord> {
        let text = html_to_text(&raw.html);
        let relevance_score = score(&text);

        if relevance_score < self.threshold {
            tracing::debug!(
                "Dropping {}: relevance {:.3} below threshold {:.3}",
                raw.url,
                relevance_score,
                self.threshold
            );
            return None;
        }

        Some(ContentRecord {
            url: raw.url,
            final_url: raw.final_url,
            html: raw.html,
            text,
            links: raw.links,
            images: raw.images,
            metadata: raw.metadata,
            relevance_score,
            tier: raw.tier,
            fetched_at: raw.fetched_at,
        })
    }
}
