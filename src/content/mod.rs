//! Content processing for fetched pages
//!
//! This module provides:
//! - Cleaning of extracted HTML fragments and conversion to plain text
//! - Page metadata extraction (title, description, keywords)
//! - Image discovery, download and content-addressed naming

mod cleaner;
mod images;
mod metadata;

pub use cleaner::{clean, html_to_text};
pub use images::{
    content_hash, extension_for, extract_image_refs, ImageAsset, ImageError, ImageRef,
    ImageResolver,
};
pub use metadata::{extract_metadata, PageMetadata};

pub(crate) use metadata::metadata_from_document;
