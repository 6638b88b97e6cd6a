//! Page-level metadata: title, description and keywords

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Metadata taken from the full page, not from the extracted content
///
/// Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
}

/// Extracts metadata from a full HTML document
///
/// # Example
///
/// ```
/// use sumi_trawl::content::extract_metadata;
///
/// let html = r#"<html><head><title> Hello </title>
///     <meta name="Description" content="A page"></head></html>"#;
/// let metadata = extract_metadata(html);
/// assert_eq!(metadata.title, "Hello");
/// assert_eq!(metadata.description, "A page");
/// assert_eq!(metadata.keywords, "");
/// ```
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    metadata_from_document(&document)
}

pub(crate) fn metadata_from_document(document: &Html) -> PageMetadata {
    PageMetadata {
        title: extract_title(document).unwrap_or_default(),
        description: extract_meta(document, "description").unwrap_or_default(),
        keywords: extract_meta(document, "keywords").unwrap_or_default(),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

/// First `<meta name=...>` whose name matches case-insensitively
fn extract_meta(document: &Html, name: &str) -> Option<String> {
    let meta_selector = Selector::parse("meta[name][content]").ok()?;

    document
        .select(&meta_selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
}
