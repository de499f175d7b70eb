//! Listing page fetcher
//!
//! Turns a [`PaginationToken`] into page content. Every attempt is bounded
//! by the configured timeout and transient failures are retried with
//! exponential backoff.
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Timeout, reset, abort, other network error | Retry with backoff |
//! | HTTP 5xx, HTTP 429 | Retry with backoff |
//! | Other HTTP error status | Fail immediately |
//! | Malformed request | Fail immediately |
//! | Attempts exhausted | `FetchError::Exhausted` with the last cause |

use crate::config::FetchConfig;
use crate::crawler::retry::{with_retry, FetchError, RetryPolicy};
use crate::record::PaginationToken;
use crate::transport::{HttpRequest, Transport};
use std::sync::Arc;
use std::time::Duration;

/// Fetches listing pages through a shared transport
#[derive(Debug)]
pub struct PageFetcher<T> {
    transport: Arc<T>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl<T: Transport> PageFetcher<T> {
    pub fn new(transport: Arc<T>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            transport,
            policy,
            timeout,
        }
    }

    pub fn from_config(transport: Arc<T>, config: &FetchConfig) -> Self {
        Self::new(transport, config.retry_policy(), config.timeout())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches the page described by `token`
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The page body
    /// * `Err(FetchError::Exhausted)` - Every attempt failed transiently
    /// * `Err(FetchError::Terminal)` - A non-retryable failure occurred
    pub async fn fetch(&self, token: &PaginationToken) -> Result<String, FetchError> {
        let request = HttpRequest::from_token(token, self.timeout);
        tracing::debug!("Fetching {}", token);

        let transport = &self.transport;
        with_retry(&self.policy, "listing page", || transport.execute(&request)).await
    }
}
