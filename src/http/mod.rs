//! HTTP layer
//!
//! - `HttpClient`: GET/POST with a fixed user agent, long timeout and
//!   legacy-charset decoding
//! - `RetryPolicy`: bounded retries with randomized backoff

mod client;
mod retry;

pub use client::{build_http_client, HttpClient, RawResponse};
pub use retry::{Exhausted, RetryPolicy};
