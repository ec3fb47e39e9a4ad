//! Retrying HTTP GET helper shared by the CEDAR and BioPortal clients.
//!
//! Only `429 Too Many Requests` is retried. Every other status is handed back
//! to the caller unchanged.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

// == Retry Policy ==
/// Backoff parameters for rate-limited requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry when no `Retry-After` is given
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    ///
    /// A parsable `Retry-After` (seconds) wins over exponential backoff. The
    /// result never exceeds `max_delay`.
    pub fn delay_for(&self, attempt: u32, headers: &HeaderMap) -> Duration {
        let delay = retry_after(headers).unwrap_or_else(|| {
            let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
            self.initial_delay.saturating_mul(factor)
        });
        delay.min(self.max_delay)
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

// == Send With Retry ==
/// Sends `request`, retrying while the server answers 429.
///
/// Returns the first non-429 response, or [`ApiError::RateLimited`] once the
/// retries are exhausted.
pub async fn send_with_retry(request: RequestBuilder, policy: &RetryPolicy) -> ApiResult<Response> {
    let mut attempt = 0;
    loop {
        let pending = request
            .try_clone()
            .ok_or_else(|| ApiError::InvalidUrl("request body cannot be replayed".to_string()))?;
        let response = pending.send().await?;

        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }

        let url = response.url().to_string();
        if attempt >= policy.max_retries {
            warn!(url = %url, attempts = attempt + 1, "Upstream still rate limiting, giving up");
            return Err(ApiError::RateLimited {
                url,
                attempts: attempt + 1,
            });
        }

        let delay = policy.delay_for(attempt, response.headers());
        debug!(url = %url, attempt, delay_ms = delay.as_millis() as u64, "Rate limited, backing off");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

// == Get JSON ==
/// Sends `request` with retries and decodes a successful body as JSON.
pub async fn get_json(request: RequestBuilder, policy: &RetryPolicy) -> ApiResult<Value> {
    let response = send_with_retry(request, policy).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}
