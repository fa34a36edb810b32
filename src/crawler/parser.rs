//! Markup extraction for listing and detail pages
//!
//! This module pulls three things out of the site's HTML:
//! - The total record count shown on a listing page
//! - The item title/link pairs on a listing page
//! - The item identifier hidden in a detail page's `mobile-agent` meta tag

use crate::{ExtractionError, ExtractionResult};
use scraper::{Html, Selector};
use std::fmt;
use url::Url;

/// Holds the total record count on a listing page
pub const TOTAL_COUNT_SELECTOR: &str = r#"div#sjina_C01_47 > ul > li > b"#;

/// Title anchors of the items on a listing page
pub const ITEM_LINK_SELECTOR: &str = r#"div.nlcd_name > a"#;

/// Meta tag whose content encodes the item identifier
pub const IDENTIFIER_META_SELECTOR: &str = r#"meta[name="mobile-agent"]"#;

/// Position of the identifier among the slash-delimited segments
const IDENTIFIER_SEGMENT: usize = 5;

/// One item listed on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    /// Visible title, unsanitized
    pub title: String,

    /// Absolute URL of the item's detail page
    pub detail_url: String,
}

/// Internal token needed to query an item's comments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentifier(String);

impl ItemIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn selector(css: &str) -> ExtractionResult<Selector> {
    Selector::parse(css).map_err(|_| ExtractionError::MissingNode {
        selector: css.to_string(),
    })
}

/// Reads the total number of records from a listing page
///
/// # Example
///
/// ```
/// use fang_comments::crawler::extract_total_count;
///
/// let html = r#"<div id="sjina_C01_47"><ul><li><b> 201 </b></li></ul></div>"#;
/// assert_eq!(extract_total_count(html).unwrap(), 201);
/// ```
pub fn extract_total_count(markup: &str) -> ExtractionResult<u64> {
    let document = Html::parse_document(markup);
    let selector = selector(TOTAL_COUNT_SELECTOR)?;

    let mut nodes = document.select(&selector).peekable();
    if nodes.peek().is_none() {
        return Err(ExtractionError::MissingNode {
            selector: TOTAL_COUNT_SELECTOR.to_string(),
        });
    }

    let raw: String = nodes.flat_map(|node| node.text()).collect();
    let value = raw.trim();
    value
        .parse::<u64>()
        .map_err(|_| ExtractionError::InvalidNumber {
            value: value.to_string(),
        })
}

/// Reads the title and absolute detail link of every item on a listing page
///
/// Links are resolved against `page_url`, so protocol-relative hrefs pick up
/// the listing page's scheme. Anchors without an `href` are skipped.
pub fn extract_item_refs(markup: &str, page_url: &Url) -> ExtractionResult<Vec<ItemRef>> {
    let document = Html::parse_document(markup);
    let selector = selector(ITEM_LINK_SELECTOR)?;

    let mut items = Vec::new();
    for anchor in document.select(&selector) {
        let title = anchor.text().collect::<String>().trim().to_string();

        let href = match anchor.value().attr("href").map(str::trim) {
            Some(href) if !href.is_empty() => href,
            _ => {
                tracing::warn!("Skipping item '{}' without a link on {}", title, page_url);
                continue;
            }
        };

        let detail_url = page_url
            .join(href)
            .map_err(|_| ExtractionError::InvalidLink {
                href: href.to_string(),
            })?;

        items.push(ItemRef {
            title,
            detail_url: detail_url.to_string(),
        });
    }

    Ok(items)
}

/// Reads the item identifier from a detail page
pub fn extract_identifier(markup: &str) -> ExtractionResult<ItemIdentifier> {
    let document = Html::parse_document(markup);
    let selector = selector(IDENTIFIER_META_SELECTOR)?;

    let content: String = document
        .select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .collect();

    if content.trim().is_empty() {
        return Err(ExtractionError::MissingNode {
            selector: format!("{}[content]", IDENTIFIER_META_SELECTOR),
        });
    }

    // Taken from the last segment rather than a fixed index: the site's value
    // has the ID at index 5, the documented `/a/b/c/d/e/12345.htm` at index 6.
    identifier_from_path(content.trim())
}

/// Extracts the identifier from a slash-delimited path
///
/// The identifier is the final segment, which sits at position 5 in the
/// site's format (`format=html5;url=//m.fang.com/xf/xian/2811151616.htm`),
/// with its `.htm` suffix removed.
///
/// # Example
///
/// ```
/// use fang_comments::crawler::identifier_from_path;
///
/// let id = identifier_from_path("/a/b/c/d/e/12345.htm").unwrap();
/// assert_eq!(id.as_str(), "12345");
/// ```
pub fn identifier_from_path(value: &str) -> ExtractionResult<ItemIdentifier> {
    let malformed = || ExtractionError::MalformedIdentifier {
        value: value.to_string(),
    };

    let segments: Vec<&str> = value.split('/').collect();
    if segments.len() <= IDENTIFIER_SEGMENT {
        return Err(malformed());
    }

    let last = segments.last().ok_or_else(malformed)?.trim();
    let id = last
        .strip_suffix(".html")
        .or_else(|| last.strip_suffix(".htm"))
        .unwrap_or(last);

    if id.is_empty() {
        return Err(malformed());
    }

    Ok(ItemIdentifier(id.to_string()))
}
