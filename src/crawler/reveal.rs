//! Hidden-field lookup
//!
//! Each listing entry hides its contact address behind a secondary request
//! keyed by the entry's reveal key. The lookup is best-effort: responses that
//! do not contain an address-shaped value resolve to `None`.

use crate::config::RevealConfig;
use crate::crawler::address::is_address;
use crate::crawler::retry::{with_retry, FetchError, RetryPolicy};
use crate::record::Method;
use crate::transport::{HttpRequest, Transport};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Resolves reveal keys through the lookup endpoint
#[derive(Debug)]
pub struct RevealFetcher<T> {
    transport: Arc<T>,
    endpoint: Url,
    key_param: String,
    field: String,
    policy: RetryPolicy,
    timeout: Duration,
}

impl<T: Transport> RevealFetcher<T> {
    pub fn new(transport: Arc<T>, endpoint: Url, config: &RevealConfig) -> Self {
        Self {
            transport,
            endpoint,
            key_param: config.key_param.clone(),
            field: config.field.clone(),
            policy: config.retry_policy(),
            timeout: config.timeout(),
        }
    }

    /// Overrides the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Looks up the hidden value for `key`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(address))` - The response carried an address-shaped value
    /// * `Ok(None)` - The response had any other shape
    /// * `Err(FetchError)` - The lookup failed; the caller decides the fallback
    pub async fn reveal(&self, key: &str) -> Result<Option<String>, FetchError> {
        let request = HttpRequest {
            method: Method::Get,
            url: self.endpoint.to_string(),
            params: vec![(self.key_param.clone(), key.to_string())],
            headers: Vec::new(),
            timeout: self.timeout,
        }
        .with_header("X-Requested-With", "XMLHttpRequest")
        .with_header("Accept", "application/json, text/plain, */*");

        let transport = &self.transport;
        let body = with_retry(&self.policy, "reveal lookup", || {
            transport.execute(&request)
        })
        .await?;

        Ok(parse_reveal_response(&body, &self.field))
    }
}

/// Extracts the revealed address from a lookup response
///
/// Accepted shapes, in order:
/// 1. The whole (trimmed) body is an address
/// 2. A JSON object whose `field` member is an address string
///
/// Anything else yields `None`.
pub fn parse_reveal_response(body: &str, field: &str) -> Option<String> {
    let trimmed = body.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    if is_address(unquoted) {
        return Some(unquoted.to_string());
    }

    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    value
        .as_object()?
        .get(field)?
        .as_str()
        .map(str::trim)
        .filter(|candidate| is_address(candidate))
        .map(str::to_string)
}
