//! Retry with exponential backoff
//!
//! Both the listing fetcher and the reveal lookup run their requests through
//! [`with_retry`]. Only transient transport failures are retried; anything
//! else fails on the first attempt.

use crate::transport::TransportError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors returned once a request has been given up on
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{what} failed after {attempts} attempts: {source}")]
    Exhausted {
        what: String,
        attempts: u32,
        source: TransportError,
    },

    #[error("{what} failed: {source}")]
    Terminal {
        what: String,
        source: TransportError,
    },
}

impl FetchError {
    /// The last underlying transport failure
    pub fn cause(&self) -> &TransportError {
        match self {
            Self::Exhausted { source, .. } | Self::Terminal { source, .. } => source,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Attempt ceiling and backoff base for one request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each later attempt
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that retries immediately, for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Delay to wait before `attempt` (1-based)
    ///
    /// The first attempt is never delayed; attempt `n >= 2` waits
    /// `base_delay * 2^(n - 2)`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Delays before each retry, in order
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        (2..=self.max_attempts)
            .map(|attempt| self.delay_before(attempt))
            .collect()
    }
}

/// Runs `operation` until it succeeds, fails terminally, or runs out of attempts
///
/// # Arguments
///
/// * `policy` - Attempt ceiling and backoff
/// * `what` - Short description used in logs and errors
/// * `operation` - Produces a fresh attempt each time it is called
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "{} succeeded after retry", what);
                }
                return Ok(value);
            }
            Err(error) if !error.is_transient() => {
                return Err(FetchError::Terminal {
                    what: what.to_string(),
                    source: error,
                });
            }
            Err(error) => {
                if attempt >= policy.max_attempts {
                    return Err(FetchError::Exhausted {
                        what: what.to_string(),
                        attempts: attempt,
                        source: error,
                    });
                }

                attempt += 1;
                let delay = policy.delay_before(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "{} failed, retrying",
                    what
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
