//! Configuration module for Fang-Comments
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A missing file is not an error at this level: callers fall back to
//! `Config::default()`, which carries the built-in crawl constants.
//!
//! # Example
//!
//! ```no_run
//! use fang_comments::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("fang.toml")).unwrap();
//! println!("Retry attempts: {}", config.http.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, HttpConfig, LoggingConfig, OutputConfig, SiteConfig, DEFAULT_COMMENT_PATH,
    DEFAULT_LISTING_URL_TEMPLATE, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
