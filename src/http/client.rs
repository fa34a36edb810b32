//! HTTP client with a fixed header set and retrying GET/POST
//!
//! The upstream site declares one charset and serves another, so every call
//! buffers the raw body and leaves decoding to the caller: `text()` trusts the
//! declared charset, the `*_with_decode` variants force a specific one.

use crate::config::HttpConfig;
use crate::http::retry::RetryPolicy;
use crate::{Result, SpiderError};
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// A fully buffered successful response
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: StatusCode,
    /// Charset parameter of the Content-Type header, if any
    pub charset: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Decodes the body with the declared charset, falling back to UTF-8
    pub fn text(&self) -> String {
        let encoding = self
            .charset
            .as_deref()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        decode_lossy(encoding, &self.body, &self.url)
    }

    /// Decodes the body with `label`, ignoring whatever the server declared
    pub fn decode(&self, label: &str) -> Result<String> {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| SpiderError::UnknownEncoding(label.to_string()))?;
        Ok(decode_lossy(encoding, &self.body, &self.url))
    }
}

fn decode_lossy(encoding: &'static Encoding, body: &[u8], url: &str) -> String {
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::warn!(
            "Body of {} contains bytes invalid in {}; replaced",
            url,
            encoding.name()
        );
    }
    text.into_owned()
}

/// Why a single attempt failed
#[derive(Debug, Error)]
enum AttemptFailure {
    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

/// Retrying HTTP client shared by every crawl task
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

/// Builds the underlying reqwest client
///
/// # Arguments
///
/// * `config` - User agent and timeout settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

impl HttpClient {
    /// Creates a client from configuration
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            retry: RetryPolicy::from(config),
        })
    }

    /// Wraps an existing reqwest client with a retry policy
    pub fn with_policy(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Sends a GET request with optional query parameters
    pub async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<RawResponse> {
        self.send("GET", url, || self.client.get(url).query(params))
            .await
    }

    /// Sends a GET request and decodes the body from `encoding`
    pub async fn get_with_decode(
        &self,
        url: &str,
        params: &[(&str, String)],
        encoding: &str,
    ) -> Result<String> {
        self.get(url, params).await?.decode(encoding)
    }

    /// Sends a form-encoded POST request
    pub async fn post(&self, url: &str, form: &[(&str, String)]) -> Result<RawResponse> {
        self.send("POST", url, || self.client.post(url).form(form))
            .await
    }

    /// Sends a form-encoded POST request and decodes the body from `encoding`
    pub async fn post_with_decode(
        &self,
        url: &str,
        form: &[(&str, String)],
        encoding: &str,
    ) -> Result<String> {
        self.post(url, form).await?.decode(encoding)
    }

    /// Runs one request under the retry policy
    ///
    /// Anything other than `200 OK`, and any transport or body-read error,
    /// fails the attempt.
    async fn send<F>(&self, method: &str, url: &str, build: F) -> Result<RawResponse>
    where
        F: Fn() -> RequestBuilder,
    {
        if url.is_empty() {
            return Err(SpiderError::RequestFailure {
                url: String::new(),
                attempts: 0,
                reason: "empty URL".to_string(),
            });
        }

        let target = format!("{} {}", method, url);
        let result = self
            .retry
            .execute(&target, |_| {
                let request = build();
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if status != StatusCode::OK {
                        return Err(AttemptFailure::Status(status));
                    }

                    let final_url = response.url().to_string();
                    let charset = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .and_then(charset_from_content_type);
                    let body = response.bytes().await?.to_vec();

                    Ok::<_, AttemptFailure>(RawResponse {
                        url: final_url,
                        status,
                        charset,
                        body,
                    })
                }
            })
            .await;

        result.map_err(|exhausted| {
            tracing::error!(
                "{} failed after {} attempt(s): {}",
                target,
                exhausted.attempts,
                exhausted.last_error
            );
            SpiderError::RequestFailure {
                url: url.to_string(),
                attempts: exhausted.attempts,
                reason: exhausted.last_error.to_string(),
            }
        })
    }
}

/// Extracts the `charset` parameter from a Content-Type value
fn charset_from_content_type(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(val.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}
