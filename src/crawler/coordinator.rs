//! Crawler coordinator - two-level fan-out
//!
//! This module drives a whole run:
//! - Derive the page count from the first listing page
//! - Spawn one task per listing page
//! - Inside each page task, spawn one task per listed item and wait for all
//!   of them before the page task returns
//! - Each item task resolves the identifier, fetches the comments and writes
//!   the output file, in that order
//!
//! Errors inside a page or item task are logged and counted, never propagated
//! to siblings. Only a failure to derive the page count aborts the run.

use crate::config::{validate, Config};
use crate::crawler::comments::CommentFetcher;
use crate::crawler::parser::{
    extract_identifier, extract_item_refs, extract_total_count, ItemIdentifier, ItemRef,
};
use crate::http::HttpClient;
use crate::output::{write_comments, CrawlStatistics, CrawlSummary};
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use url::Url;

/// Number of listing pages needed for `total_records` at `page_size` per page
///
/// # Example
///
/// ```
/// use fang_comments::crawler::page_count;
///
/// assert_eq!(page_count(200, 20), 10);
/// assert_eq!(page_count(201, 20), 11);
/// assert_eq!(page_count(0, 20), 0);
/// assert_eq!(page_count(5, 0), 0);
/// ```
pub fn page_count(total_records: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }

    let quotient = total_records / page_size;
    if total_records % page_size == 0 {
        quotient
    } else {
        quotient + 1
    }
}

/// What happened to a single item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Comments were written to this file
    Written { path: PathBuf, lines: usize },
    /// The item has no comments; nothing was written
    NoComments,
}

/// Main crawler coordinator structure
///
/// Cloning is cheap; every task holds its own clone.
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: Arc<Config>,
    client: Arc<HttpClient>,
    fetcher: Arc<CommentFetcher>,
    stats: Arc<CrawlStatistics>,
}

impl Coordinator {
    /// Validates `config` and builds the HTTP client from `config.http`
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        let client = HttpClient::new(&config.http)?;
        Self::with_client(config, client)
    }

    /// Creates a coordinator around an existing client
    ///
    /// `config` is validated here too; a zero page size would otherwise reach
    /// `page_count`.
    pub fn with_client(config: Config, client: HttpClient) -> Result<Self> {
        validate(&config)?;
        let client = Arc::new(client);
        let fetcher = CommentFetcher::new(Arc::clone(&client), &config.site);

        Ok(Self {
            config: Arc::new(config),
            client,
            fetcher: Arc::new(fetcher),
            stats: Arc::new(CrawlStatistics::new()),
        })
    }

    pub fn stats(&self) -> &CrawlStatistics {
        &self.stats
    }

    /// Derives the number of listing pages from page 1's total record count
    pub async fn derive_page_count(&self) -> Result<u64> {
        let url = self.config.site.listing_url(1);
        let markup = self
            .client
            .get_with_decode(&url, &[], &self.config.site.listing_encoding)
            .await?;

        let total = extract_total_count(&markup)?;
        let pages = page_count(total, u64::from(self.config.crawler.page_size));
        tracing::info!("{} record(s) listed across {} page(s)", total, pages);
        Ok(pages)
    }

    /// Runs the whole crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The run finished; individual pages or items may
    ///   still have failed and are counted in the summary
    /// * `Err(SpiderError)` - The page count could not be derived
    pub async fn run(&self) -> Result<CrawlSummary> {
        let pages = self.derive_page_count().await?;
        self.stats.set_pages_planned(pages);

        let mut page_tasks = JoinSet::new();
        for page in 1..=pages {
            let this = self.clone();
            page_tasks.spawn(
                async move { this.crawl_page(page).await }
                    .instrument(tracing::info_span!("page", page)),
            );
        }

        while let Some(joined) = page_tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Page task aborted: {}", e);
                self.stats.record_page_failed();
            }
        }

        let summary = self.stats.snapshot();
        tracing::info!(
            "Crawl finished: {} file(s) written, {} item(s) skipped, {} page(s) failed",
            summary.items_written,
            summary.items_skipped,
            summary.pages_failed
        );
        Ok(summary)
    }

    /// Lists one page and processes all of its items
    ///
    /// Returns only after every item task of the page has finished.
    pub async fn crawl_page(&self, page: u64) {
        let items = match self.list_page(page).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("Failed to list page {}: {}", page, e);
                self.stats.record_page_failed();
                return;
            }
        };

        tracing::info!("Page {} lists {} item(s)", page, items.len());
        self.stats.record_page_listed(items.len());

        // One task per item unless a cap is configured
        let limit = self
            .config
            .crawler
            .max_items_in_flight
            .map(|n| Arc::new(Semaphore::new(n)));

        let mut item_tasks = JoinSet::new();
        for item in items {
            let this = self.clone();
            let limit = limit.clone();
            let span = tracing::info_span!(
                "item",
                title = %item.title,
                url = %item.detail_url,
                identifier = tracing::field::Empty,
            );
            item_tasks.spawn(
                async move {
                    let _permit = match &limit {
                        Some(semaphore) => semaphore.acquire().await.ok(),
                        None => None,
                    };
                    this.handle_item(&item).await
                }
                .instrument(span),
            );
        }

        while let Some(joined) = item_tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Item task on page {} aborted: {}", page, e);
                self.stats.record_skipped();
            }
        }
    }

    /// Fetches one listing page and extracts its items
    pub async fn list_page(&self, page: u64) -> Result<Vec<ItemRef>> {
        let url = self.config.site.listing_url(page);
        let markup = self
            .client
            .get_with_decode(&url, &[], &self.config.site.listing_encoding)
            .await?;

        let page_url = Url::parse(&url)?;
        Ok(extract_item_refs(&markup, &page_url)?)
    }

    /// Fetches an item's detail page and extracts its identifier
    pub async fn resolve_identifier(&self, item: &ItemRef) -> Result<ItemIdentifier> {
        let response = self.client.get(&item.detail_url, &[]).await?;
        let markup = match &self.config.site.detail_encoding {
            Some(label) => response.decode(label)?,
            None => response.text(),
        };
        Ok(extract_identifier(&markup)?)
    }

    /// Resolves, fetches and writes one item
    pub async fn process_item(&self, item: &ItemRef) -> Result<ItemOutcome> {
        let identifier = self.resolve_identifier(item).await?;
        self.stats.record_identifier();
        tracing::Span::current().record("identifier", identifier.as_str());
        tracing::info!("Resolved identifier {}", identifier);

        let batch = self.fetcher.fetch(&item.detail_url, &identifier).await?;
        if batch.is_empty() {
            return Ok(ItemOutcome::NoComments);
        }

        let lines = batch.lines();
        let path = write_comments(
            &self.config.output.directory,
            &item.title,
            batch.count,
            &lines,
        )
        .await?;

        Ok(ItemOutcome::Written {
            path,
            lines: lines.len(),
        })
    }

    /// Task boundary for one item: errors stop here
    async fn handle_item(&self, item: &ItemRef) {
        match self.process_item(item).await {
            Ok(ItemOutcome::Written { path, lines }) => {
                tracing::info!("Wrote {} comment(s) to {}", lines, path.display());
                self.stats.record_written(lines);
            }
            Ok(ItemOutcome::NoComments) => {
                self.stats.record_no_comments();
            }
            Err(e) => {
                tracing::error!(
                    "Skipping '{}' ({}): {}",
                    item.title,
                    item.detail_url,
                    e
                );
                self.stats.record_skipped();
            }
        }
    }
}
