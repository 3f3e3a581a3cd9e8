//! Exponential backoff for provider requests.
//!
//! Only transient failures are repeated: timeouts, refused connections, 5xx,
//! 429 and 408. A bad key or an unknown location fails on the first attempt.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use tracing::{debug, warn};

/// Backoff policy for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first request
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each one after
    pub initial_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3, 200, 5_000)
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Wait before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let doubled = self
            .initial_delay
            .checked_mul(1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX))
            .unwrap_or(self.max_delay);
        doubled.min(self.max_delay)
    }
}

/// Whether a response status is worth another attempt.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Whether a transport error is worth another attempt.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    error.status().is_some_and(is_transient_status)
}

/// Run `send` until it yields a non-transient outcome or retries run out.
///
/// The last response is returned even when its status is still transient, so
/// the caller can map it to a provider error.
pub async fn with_retry<F, Fut>(config: &RetryConfig, send: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut retry = 0;
    loop {
        let outcome = send().await;
        let transient = match &outcome {
            Ok(response) => is_transient_status(response.status()),
            Err(e) => is_transient_error(e),
        };

        if !transient || retry >= config.max_retries {
            if retry > 0 {
                debug!("Request settled after {} retries", retry);
            }
            return outcome;
        }

        retry += 1;
        let wait = config.backoff(retry);
        match &outcome {
            Ok(response) => warn!(
                "Provider answered {}; retry {}/{} in {:?}",
                response.status(),
                retry,
                config.max_retries,
                wait
            ),
            Err(e) => warn!(
                "Provider unreachable ({}); retry {}/{} in {:?}",
                e, retry, config.max_retries, wait
            ),
        }
        tokio::time::sleep(wait).await;
    }
}
