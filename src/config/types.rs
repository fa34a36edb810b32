use serde::Deserialize;
use std::path::PathBuf;

/// Default listing URL; `{page}` is replaced with the 1-based page index
pub const DEFAULT_LISTING_URL_TEMPLATE: &str =
    "https://xian.newhouse.fang.com/house/s/b9{page}/?ctm=1.xian.xf_search.page.1";

/// Path of the comment endpoint, relative to an item's detail URL
pub const DEFAULT_COMMENT_PATH: &str = "/house/ajaxrequest/dianpingList_201501.php";

/// Fixed browser user agent sent with every request
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.14; rv:73.0) Gecko/20100101 Firefox/73.0";

/// Main configuration structure
///
/// Every section is optional in the TOML file; `Config::default()` is the
/// complete built-in behavior.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Target site endpoints and encodings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Listing page URL containing a `{page}` placeholder
    #[serde(rename = "listing-url-template")]
    pub listing_url_template: String,

    /// Charset the listing pages are actually served in
    #[serde(rename = "listing-encoding")]
    pub listing_encoding: String,

    /// Forced charset for detail pages; the declared charset is used when unset
    #[serde(rename = "detail-encoding")]
    pub detail_encoding: Option<String>,

    /// Forced charset for comment responses; UTF-8 when unset
    #[serde(rename = "comment-encoding")]
    pub comment_encoding: Option<String>,

    /// Comment endpoint path appended to each detail URL
    #[serde(rename = "comment-path")]
    pub comment_path: String,

    /// City name sent with every comment query
    pub city: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            listing_url_template: DEFAULT_LISTING_URL_TEMPLATE.to_string(),
            listing_encoding: "gbk".to_string(),
            detail_encoding: None,
            comment_encoding: None,
            comment_path: DEFAULT_COMMENT_PATH.to_string(),
            city: "西安".to_string(),
        }
    }
}

/// HTTP client and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Total attempts per request, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Lower bound of the random delay before a retry (milliseconds)
    #[serde(rename = "backoff-min-ms")]
    pub backoff_min_ms: u64,

    /// Upper bound of the random delay before a retry (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 300,
            max_attempts: 5,
            backoff_min_ms: 1000,
            backoff_max_ms: 5000,
        }
    }
}

/// Fan-out behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of items the site shows per listing page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Optional cap on concurrently resolving items within one page
    #[serde(rename = "max-items-in-flight")]
    pub max_items_in_flight: Option<usize>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_items_in_flight: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one comment file per item
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("fang_comments"),
        }
    }
}

/// Log file configuration
///
/// INFO and ERROR events go to separate files; each file holds exactly one
/// level, so the error file lists the skipped items and nothing else.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write the two level files in addition to the console
    #[serde(rename = "file-output")]
    pub file_output: bool,

    /// Directory holding both log files
    pub directory: PathBuf,

    #[serde(rename = "info-file")]
    pub info_file: String,

    #[serde(rename = "error-file")]
    pub error_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_output: true,
            directory: PathBuf::from("."),
            info_file: "spider.log".to_string(),
            error_file: "spider_error.log".to_string(),
        }
    }
}

impl SiteConfig {
    /// Builds the listing URL for a 1-based page index
    pub fn listing_url(&self, page: u64) -> String {
        self.listing_url_template.replace("{page}", &page.to_string())
    }
}
