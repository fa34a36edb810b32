//! Bounded retry with randomized backoff
//!
//! Many workers hit the same host at once, so the delay before each retry is
//! drawn uniformly from `[min_backoff, max_backoff]` instead of following a
//! fixed schedule.

use crate::config::HttpConfig;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry budget for one logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

/// The last error seen once every attempt has failed
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(5000),
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            min_backoff: Duration::from_millis(config.backoff_min_ms),
            max_backoff: Duration::from_millis(config.backoff_max_ms),
        }
    }
}

impl RetryPolicy {
    /// Picks the delay to sleep before the next attempt
    pub fn backoff(&self) -> Duration {
        let min = self.min_backoff.as_millis() as u64;
        let max = self.max_backoff.as_millis() as u64;
        if min >= max {
            return self.min_backoff;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Runs `op` until it succeeds or `max_attempts` attempts have failed
    ///
    /// `op` receives the 1-based attempt number. Each failure is logged with
    /// `target` for context; no sleep happens after the final attempt.
    ///
    /// # Example
    ///
    /// ```
    /// use fang_comments::http::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// # async fn example() {
    /// let policy = RetryPolicy {
    ///     max_attempts: 3,
    ///     min_backoff: Duration::ZERO,
    ///     max_backoff: Duration::ZERO,
    /// };
    /// let result = policy
    ///     .execute("demo", |attempt| async move {
    ///         if attempt < 3 { Err("not yet") } else { Ok(attempt) }
    ///     })
    ///     .await;
    /// assert_eq!(result.unwrap(), 3);
    /// # }
    /// ```
    pub async fn execute<T, E, F, Fut>(&self, target: &str, mut op: F) -> Result<T, Exhausted<E>>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}", target, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => {
                    return Err(Exhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.backoff();
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        target,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
