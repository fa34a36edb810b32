//! Run statistics
//!
//! Counters are shared by every page and item task, so they are plain
//! atomics; `snapshot` turns them into a `CrawlSummary` once the run is over.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one crawl run
#[derive(Debug, Default)]
pub struct CrawlStatistics {
    pages_planned: AtomicU64,
    pages_listed: AtomicU64,
    pages_failed: AtomicU64,
    items_discovered: AtomicU64,
    identifiers_resolved: AtomicU64,
    items_written: AtomicU64,
    items_without_comments: AtomicU64,
    items_skipped: AtomicU64,
    comments_written: AtomicU64,
}

/// Final numbers of a crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Pages derived from the total record count
    pub pages_planned: u64,
    /// Pages whose item list was read successfully
    pub pages_listed: u64,
    /// Pages that could not be fetched or parsed
    pub pages_failed: u64,
    pub items_discovered: u64,
    pub identifiers_resolved: u64,
    /// Items that produced an output file
    pub items_written: u64,
    /// Items whose comment count was zero
    pub items_without_comments: u64,
    /// Items dropped because of an error
    pub items_skipped: u64,
    pub comments_written: u64,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pages_planned(&self, pages: u64) {
        self.pages_planned.store(pages, Ordering::Relaxed);
    }

    pub fn record_page_listed(&self, items: usize) {
        self.pages_listed.fetch_add(1, Ordering::Relaxed);
        self.items_discovered
            .fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn record_page_failed(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_identifier(&self) {
        self.identifiers_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self, lines: usize) {
        self.items_written.fetch_add(1, Ordering::Relaxed);
        self.comments_written
            .fetch_add(lines as u64, Ordering::Relaxed);
    }

    pub fn record_no_comments(&self) {
        self.items_without_comments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.items_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlSummary {
        CrawlSummary {
            pages_planned: self.pages_planned.load(Ordering::Relaxed),
            pages_listed: self.pages_listed.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            items_discovered: self.items_discovered.load(Ordering::Relaxed),
            identifiers_resolved: self.identifiers_resolved.load(Ordering::Relaxed),
            items_written: self.items_written.load(Ordering::Relaxed),
            items_without_comments: self.items_without_comments.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
            comments_written: self.comments_written.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Crawl Statistics ===")?;
        writeln!(
            f,
            "Pages:    {} planned, {} listed, {} failed",
            self.pages_planned, self.pages_listed, self.pages_failed
        )?;
        writeln!(
            f,
            "Items:    {} discovered, {} identifiers resolved",
            self.items_discovered, self.identifiers_resolved
        )?;
        writeln!(
            f,
            "Output:   {} file(s), {} comment line(s), {} item(s) without comments",
            self.items_written, self.comments_written, self.items_without_comments
        )?;
        write!(f, "Skipped:  {} item(s)", self.items_skipped)
    }
}

/// Prints the summary to stdout
pub fn print_statistics(summary: &CrawlSummary) {
    println!("{}", summary);
}
