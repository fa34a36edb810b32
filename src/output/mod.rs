//! Output module
//!
//! This module handles:
//! - Writing one comment file per item
//! - Recording crawl statistics for the end-of-run summary

mod files;
pub mod stats;

pub use files::{comment_file_name, sanitize_title, write_comments};
pub use stats::{print_statistics, CrawlStatistics, CrawlSummary};
