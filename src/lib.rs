//! Fang-Comments: a two-stage comment crawler for new-home listings
//!
//! This crate enumerates paginated listing pages, resolves the internal
//! identifier of every listed item from its detail page, and then pulls the
//! complete review set for that item through the comment endpoint, writing
//! one text file per item.

pub mod config;
pub mod crawler;
pub mod http;
pub mod logging;
pub mod output;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request to {url} failed after {attempts} attempt(s): {reason}")]
    RequestFailure {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Unknown character encoding: {0}")]
    UnknownEncoding(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log file setup failed: {0}")]
    LogSetup(#[from] tracing_appender::rolling::InitError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while pulling structured records out of markup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("No node matches `{selector}`")]
    MissingNode { selector: String },

    #[error("Expected a number, got '{value}'")]
    InvalidNumber { value: String },

    #[error("Cannot extract an identifier from '{value}'")]
    MalformedIdentifier { value: String },

    #[error("Cannot resolve link '{href}'")]
    InvalidLink { href: String },
}

/// A comment endpoint response that does not match the expected schema
#[derive(Debug, Error)]
#[error("Invalid JSON from {url}: {source}")]
pub struct ParseError {
    pub url: String,
    #[source]
    pub source: serde_json::Error,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for markup extraction
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CommentBatch, CommentRecord, Coordinator, ItemIdentifier, ItemRef};
pub use http::{HttpClient, RetryPolicy};
pub use output::{CrawlStatistics, CrawlSummary};
