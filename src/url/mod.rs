//! URL handling module for Sumi-Trawl
//!
//! This module provides fetch-target validation, reference resolution against a
//! page URL, and the origin helpers used by the robots.txt cache.

mod domain;

pub use domain::{origin_key, robots_url};

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses and validates a fetch target
///
/// Accepts only absolute URLs with an `http` or `https` scheme and a
/// non-empty host.
///
/// # Examples
///
/// ```
/// use sumi_trawl::url::parse_target;
///
/// assert!(parse_target("https://example.com").is_ok());
/// assert!(parse_target("example.com").is_err());
/// assert!(parse_target("ftp://example.com").is_err());
/// ```
pub fn parse_target(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost),
    }
}

/// Returns true if `raw` is an acceptable fetch target
pub fn is_valid_url(raw: &str) -> bool {
    parse_target(raw).is_ok()
}

/// Resolves a reference found in a page against the page URL
///
/// Standard base-URL join semantics: absolute references pass through
/// unchanged, `/`-rooted paths replace the base path, and relative paths are
/// joined against the base's directory. Only http(s) results are returned.
pub fn resolve_reference(base: &Url, reference: &str) -> Option<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let resolved = base.join(reference).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}
