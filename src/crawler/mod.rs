//! Crawler module
//!
//! This module contains the crawl pipeline:
//! - Listing and detail page extraction
//! - Two-phase comment retrieval
//! - Page-level and item-level fan-out coordination

mod comments;
mod coordinator;
mod parser;

pub use comments::{normalize_content, CommentBatch, CommentFetcher, CommentRecord};
pub use coordinator::{page_count, Coordinator, ItemOutcome};
pub use parser::{
    extract_identifier, extract_item_refs, extract_total_count, identifier_from_path,
    ItemIdentifier, ItemRef,
};

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::SpiderError;

/// Runs a complete crawl
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client
/// 2. Derive the number of listing pages
/// 3. Fan out one task per page and one task per item
/// 4. Write one comment file per item that has comments
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed; see the summary for skipped items
/// * `Err(SpiderError)` - The crawl could not start
pub async fn crawl(config: Config) -> Result<CrawlSummary, SpiderError> {
    Coordinator::new(config)?.run().await
}
