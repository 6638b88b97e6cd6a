//! Image discovery and download
//!
//! Image references are collected from the extracted content fragment,
//! resolved against the page URL, downloaded and named after a hash of their
//! bytes. A failing image is logged and skipped; it never fails the page.

use crate::crawler::classify_error;
use crate::url::resolve_reference;
use image::GenericImageView;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Hex characters of the SHA-256 digest kept in the content hash
const CONTENT_HASH_LEN: usize = 16;

/// Per-image download failure
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("Request for image {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Image {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Image {url} has non-image content type '{content_type}'")]
    NotAnImage { url: String, content_type: String },

    #[error("Image {url} has an empty body")]
    Empty { url: String },
}

/// An `<img>` reference found in a content fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Raw `src` as written in the page
    pub src: String,
    pub alt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A downloaded image
#[derive(Debug, Clone, Serialize)]
pub struct ImageAsset {
    /// `src` as written in the page
    pub source_url: String,

    /// Resolved URL the image was requested from
    pub absolute_url: String,

    pub alt_text: String,
    pub width: Option<u32>,
    pub height: Option<u32>,

    /// Content-Type reported by the server
    pub content_type: String,

    /// Truncated SHA-256 hex digest of the bytes
    pub content_hash: String,

    /// `image_<content_hash>.<ext>`
    pub filename: String,

    /// Raw image bytes
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Collects `<img>` references from an HTML fragment
///
/// Empty sources and inline `data:` URIs are skipped.
pub fn extract_image_refs(html: &str) -> Vec<ImageRef> {
    let fragment = Html::parse_fragment(html);
    let Ok(img_selector) = Selector::parse("img") else {
        return Vec::new();
    };

    fragment
        .select(&img_selector)
        .filter_map(|element| {
            let attrs = element.value();
            let src = attrs
                .attr("src")
                .or_else(|| attrs.attr("data-src"))
                .map(str::trim)
                .filter(|src| !src.is_empty())?;

            if src.to_ascii_lowercase().starts_with("data:") {
                return None;
            }

            Some(ImageRef {
                src: src.to_string(),
                alt: attrs.attr("alt").unwrap_or("").trim().to_string(),
                width: attrs.attr("width").and_then(parse_dimension),
                height: attrs.attr("height").and_then(parse_dimension),
            })
        })
        .collect()
}

/// Downloads the images referenced by content fragments
#[derive(Debug, Clone)]
pub struct ImageResolver {
    client: Client,

    /// Upper bound on download attempts per page
    max_per_page: usize,
}

impl ImageResolver {
    pub fn new(client: Client, max_per_page: usize) -> Self {
        Self {
            client,
            max_per_page,
        }
    }

    /// Resolves and downloads every image referenced in `html`
    ///
    /// References are resolved against `base_url` and de-duplicated by
    /// absolute URL. Failures are logged and skipped.
    pub async fn resolve_images(&self, html: &str, base_url: &Url) -> Vec<ImageAsset> {
        let refs = extract_image_refs(html);
        let mut seen = HashSet::new();
        let mut attempted = 0;
        let mut assets = Vec::new();

        for image_ref in refs {
            let Some(absolute) = resolve_reference(base_url, &image_ref.src) else {
                tracing::debug!("Skipping unresolvable image reference: {}", image_ref.src);
                continue;
            };

            if !seen.insert(absolute.to_string()) {
                continue;
            }

            if attempted >= self.max_per_page {
                tracing::debug!(
                    "Image limit of {} reached for {}, ignoring the rest",
                    self.max_per_page,
                    base_url
                );
                break;
            }
            attempted += 1;

            match self.download(&image_ref, &absolute).await {
                Ok(asset) => {
                    tracing::debug!("Downloaded image {} as {}", absolute, asset.filename);
                    assets.push(asset);
                }
                Err(e) => tracing::warn!("Skipping image: {}", e),
            }
        }

        assets
    }

    /// Downloads a single image
    pub async fn download(&self, image_ref: &ImageRef, url: &Url) -> Result<ImageAsset, ImageError> {
        let request_error = |message: String| ImageError::Request {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(classify_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .trim()
            .to_string();

        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(ImageError::NotAnImage {
                url: url.to_string(),
                content_type,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_error(classify_error(&e)))?
            .to_vec();

        if bytes.is_empty() {
            return Err(ImageError::Empty {
                url: url.to_string(),
            });
        }

        let content_hash = content_hash(&bytes);
        let filename = format!(
            "image_{}.{}",
            content_hash,
            extension_for(&content_type, url)
        );

        let (width, height) = match (image_ref.width, image_ref.height) {
            (Some(w), Some(h)) => (Some(w), Some(h)),
            (w, h) => match probe_dimensions(&bytes) {
                Some((pw, ph)) => (w.or(Some(pw)), h.or(Some(ph))),
                None => (w, h),
            },
        };

        Ok(ImageAsset {
            source_url: image_ref.src.clone(),
            absolute_url: url.to_string(),
            alt_text: image_ref.alt.clone(),
            width,
            height,
            content_type,
            content_hash,
            filename,
            bytes,
        })
    }
}

/// Truncated SHA-256 hex digest of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());
    digest[..CONTENT_HASH_LEN].to_string()
}

/// File extension for an image, from its content type, then its URL
pub fn extension_for(content_type: &str, url: &Url) -> String {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let known = match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/bmp" => Some("bmp"),
        "image/avif" => Some("avif"),
        "image/tiff" => Some("tiff"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

/// Parses an HTML width/height attribute such as `640` or `640px`
fn parse_dimension(raw: &str) -> Option<u32> {
    raw.trim().trim_end_matches("px").trim().parse().ok()
}

fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::load_from_memory(bytes)
        .ok()
        .map(|img| img.dimensions())
}
