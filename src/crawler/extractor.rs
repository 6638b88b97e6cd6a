//! Main-content extraction tiers
//!
//! Each tier turns a page body into a cleaned HTML fragment holding the
//! page's main content, or reports that it found nothing usable. Tiers are
//! tried in order by the crawler; see [`crate::crawler::Crawler::fetch`].

use crate::content::{clean, html_to_text};
use scraper::{Html, Selector};
use serde::Serialize;
use std::io::Cursor;
use url::Url;

/// Noise elements removed before the DOM fallback picks a container
const NOISE_SELECTOR: &str = "script, style, nav, footer, header, iframe, noscript";

/// Candidate containers for the DOM fallback, most specific first
const CONTAINER_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "[class*='content']",
    "[class*='article']",
    "[class*='main']",
    "body",
];

/// A main-content extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    /// Readability-style article extraction
    Readability,

    /// Strip noise elements and take the main container of the document
    DomFallback,
}

/// Result of running one tier over a page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    /// Cleaned HTML fragment with the main content
    Content(String),

    /// Nothing usable; the reason is logged
    Empty(String),
}

impl ExtractionTier {
    /// The default tier order: readability first, DOM fallback second
    pub fn default_order() -> Vec<ExtractionTier> {
        vec![ExtractionTier::Readability, ExtractionTier::DomFallback]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Readability => "readability",
            Self::DomFallback => "dom_fallback",
        }
    }

    /// Extracts the main content from `body`
    ///
    /// `min_content_length` applies to the readability tier only: an article
    /// with fewer text characters is treated as a miss. The DOM fallback
    /// accepts any non-empty text.
    pub fn extract(&self, body: &str, url: &Url, min_content_length: usize) -> TierOutcome {
        match self {
            Self::Readability => extract_readability(body, url, min_content_length),
            Self::DomFallback => extract_dom_fallback(body),
        }
    }
}

fn extract_readability(body: &str, url: &Url, min_content_length: usize) -> TierOutcome {
    let mut cursor = Cursor::new(body.as_bytes());
    let product = match readability::extractor::extract(&mut cursor, url) {
        Ok(product) => product,
        Err(_) => return TierOutcome::Empty("readability found no article".to_string()),
    };

    let cleaned = clean(&product.content);
    let text_length = html_to_text(&cleaned).chars().count();
    if text_length < min_content_length {
        return TierOutcome::Empty(format!(
            "article text too short ({} < {} characters)",
            text_length, min_content_length
        ));
    }

    TierOutcome::Content(cleaned)
}

fn extract_dom_fallback(body: &str) -> TierOutcome {
    let mut document = Html::parse_document(body);

    if let Ok(noise) = Selector::parse(NOISE_SELECTOR) {
        let noisy: Vec<_> = document.select(&noise).map(|element| element.id()).collect();
        for id in noisy {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    // First candidate with text wins; an empty layout shell falls through
    let chosen = CONTAINER_SELECTORS
        .iter()
        .filter_map(|selector| Selector::parse(selector).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .map(|element| clean(&element.html()))
                .find(|cleaned| !html_to_text(cleaned).is_empty())
        });

    if let Some(cleaned) = chosen {
        return TierOutcome::Content(cleaned);
    }

    let cleaned = clean(&document.root_element().html());
    if html_to_text(&cleaned).is_empty() {
        return TierOutcome::Empty("document has no text after removing noise".to_string());
    }

    TierOutcome::Content(cleaned)
}
