//! HTTP transport layer
//!
//! The crawler never talks to `reqwest` directly. It builds an
//! [`HttpRequest`] and hands it to a [`Transport`], which lets tests swap in
//! scripted transports and lets the retry layer classify failures without
//! knowing which client produced them.

use crate::config::UserAgentConfig;
use crate::record::{Method, PaginationToken};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by a single transport attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection reset by peer")]
    ConnectionReset,

    #[error("Connection aborted")]
    Aborted,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Returns true if retrying the same request may succeed
    ///
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Timeout, reset, abort | yes |
    /// | Other network-layer error | yes |
    /// | HTTP 5xx, HTTP 429 | yes |
    /// | Other HTTP status | no |
    /// | Malformed request | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionReset | Self::Aborted | Self::Network(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            Self::InvalidRequest(_) => false,
        }
    }
}

/// A fully described outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Query parameters for GET, form body for POST
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Builds the request for a pagination token
    pub fn from_token(token: &PaginationToken, timeout: Duration) -> Self {
        Self {
            method: token.method,
            url: token.target.to_string(),
            params: token.params.clone(),
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Executes HTTP requests and returns the response body
pub trait Transport {
    fn execute(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::UserAgentConfig;
/// use sumi_harvest::transport::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the transport with the configured user agent
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<String, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url).query(&request.params),
            Method::Post => self.client.post(&request.url).form(&request.params),
        };
        builder = builder.timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response.text().await.map_err(classify_error)
    }
}

/// Maps a `reqwest` error onto the transport taxonomy
fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout;
    }
    if error.is_builder() {
        return TransportError::InvalidRequest(error.to_string());
    }
    if let Some(kind) = io_error_kind(&error) {
        match kind {
            std::io::ErrorKind::ConnectionReset => return TransportError::ConnectionReset,
            std::io::ErrorKind::ConnectionAborted => return TransportError::Aborted,
            std::io::ErrorKind::TimedOut => return TransportError::Timeout,
            _ => {}
        }
    }
    TransportError::Network(error.to_string())
}

/// Walks the source chain looking for an underlying I/O error
fn io_error_kind(error: &(dyn std::error::Error + 'static)) -> Option<std::io::ErrorKind> {
    let mut current = error.source();
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        current = err.source();
    }
    None
}
