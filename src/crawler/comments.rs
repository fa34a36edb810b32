//! Two-phase comment retrieval
//!
//! The comment endpoint is paginated, but accepts any page size. We ask for a
//! single record to learn the total `count`, then ask again with
//! `pagesize = count` to get everything in one response.

use crate::config::SiteConfig;
use crate::crawler::parser::ItemIdentifier;
use crate::http::HttpClient;
use crate::{ParseError, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// One user review
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommentRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub username: String,
    #[serde(deserialize_with = "string_or_number")]
    pub create_time: String,
    pub content: String,
}

impl CommentRecord {
    /// Formats the record as one output line
    ///
    /// Content is trimmed, then every literal `<br/>` is removed with nothing
    /// put in its place.
    ///
    /// # Example
    ///
    /// ```
    /// use fang_comments::CommentRecord;
    ///
    /// let record = CommentRecord {
    ///     user_id: "7".to_string(),
    ///     username: "li".to_string(),
    ///     create_time: "2020-03-01".to_string(),
    ///     content: "  hello<br/>world  ".to_string(),
    /// };
    /// assert_eq!(record.format_line(), "[7]|[li]|[2020-03-01]|helloworld\n");
    /// ```
    pub fn format_line(&self) -> String {
        format!(
            "[{}]|[{}]|[{}]|{}\n",
            self.user_id,
            self.username,
            self.create_time,
            normalize_content(&self.content)
        )
    }
}

pub fn normalize_content(content: &str) -> String {
    content.trim().replace("<br/>", "")
}

/// All comments of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBatch {
    /// Total declared by the count phase, used verbatim as the page size
    pub count: u64,
    pub records: Vec<CommentRecord>,
}

impl CommentBatch {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn lines(&self) -> Vec<String> {
        self.records.iter().map(CommentRecord::format_line).collect()
    }
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    #[serde(deserialize_with = "count_value")]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    list: Vec<CommentRecord>,
}

/// Accepts JSON strings, numbers, and null (as an empty string)
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;

    impl<'de> de::Visitor<'de> for Visitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(Visitor)
}

/// Accepts a non-negative integer or a numeric string
fn count_value<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = string_or_number(deserializer)?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| de::Error::custom(format!("invalid comment count '{}'", raw)))
}

/// Fetches and formats the comment set of one item
#[derive(Debug, Clone)]
pub struct CommentFetcher {
    client: Arc<HttpClient>,
    city: String,
    comment_path: String,
    encoding: Option<String>,
}

impl CommentFetcher {
    pub fn new(client: Arc<HttpClient>, site: &SiteConfig) -> Self {
        Self {
            client,
            city: site.city.clone(),
            comment_path: site.comment_path.clone(),
            encoding: site.comment_encoding.clone(),
        }
    }

    /// Comment endpoint for an item
    pub fn endpoint(&self, detail_url: &str) -> String {
        format!("{}{}", detail_url.trim_end_matches('/'), self.comment_path)
    }

    /// Form body of one comment query
    pub fn form(&self, identifier: &ItemIdentifier, page_size: u64) -> Vec<(&'static str, String)> {
        vec![
            ("city", self.city.clone()),
            ("dianpingNewcode", identifier.to_string()),
            ("ifjiajing", "0".to_string()),
            ("tid", String::new()),
            ("page", "1".to_string()),
            ("pagesize", page_size.to_string()),
            ("starnum", "0".to_string()),
            ("shtag", "-1".to_string()),
            ("rand", rand::random::<f64>().to_string()),
        ]
    }

    /// Runs both phases for one item
    ///
    /// A zero count ends the exchange after the first request; the returned
    /// batch is empty and must not be written.
    pub async fn fetch(
        &self,
        detail_url: &str,
        identifier: &ItemIdentifier,
    ) -> Result<CommentBatch> {
        let endpoint = self.endpoint(detail_url);

        let count = self.fetch_count(&endpoint, identifier).await?;
        if count == 0 {
            tracing::info!("No comments for identifier {}", identifier);
            return Ok(CommentBatch {
                count,
                records: Vec::new(),
            });
        }

        tracing::info!(
            "Identifier {} has {} comment(s), fetching all",
            identifier,
            count
        );
        let records = self.fetch_all(&endpoint, identifier, count).await?;
        if records.len() as u64 != count {
            tracing::warn!(
                "Identifier {} declared {} comment(s) but returned {}",
                identifier,
                count,
                records.len()
            );
        }

        Ok(CommentBatch { count, records })
    }

    /// Count phase: one record per page, read `count`
    pub async fn fetch_count(&self, endpoint: &str, identifier: &ItemIdentifier) -> Result<u64> {
        let body = self.query(endpoint, identifier, 1).await?;
        let parsed: CountResponse = parse_json(endpoint, &body)?;
        Ok(parsed.count)
    }

    /// Fetch-all phase: one page sized exactly to `count`
    pub async fn fetch_all(
        &self,
        endpoint: &str,
        identifier: &ItemIdentifier,
        count: u64,
    ) -> Result<Vec<CommentRecord>> {
        let body = self.query(endpoint, identifier, count).await?;
        let parsed: ListResponse = parse_json(endpoint, &body)?;
        Ok(parsed.list)
    }

    async fn query(
        &self,
        endpoint: &str,
        identifier: &ItemIdentifier,
        page_size: u64,
    ) -> Result<String> {
        let form = self.form(identifier, page_size);
        match &self.encoding {
            Some(label) => self.client.post_with_decode(endpoint, &form, label).await,
            None => Ok(self.client.post(endpoint, &form).await?.text()),
        }
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| {
        ParseError {
            url: url.to_string(),
            source,
        }
        .into()
    })
}
