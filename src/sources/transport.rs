//! I/O primitives used to fetch source content.

use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// A raw HTTP response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport used to read files and perform HTTP GETs.
///
/// Implement this trait to plug in a different HTTP stack, add caching or
/// timeouts, or to serve content from memory in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform an HTTP GET with the given headers.
    ///
    /// Non-success statuses must be returned as a response, not as an error;
    /// only failures to obtain a response at all are errors.
    async fn get(&self, url: &str, headers: &BTreeMap<String, String>) -> Result<HttpResponse>;

    /// Read a file as UTF-8 text.
    ///
    /// A missing file must surface as [`std::io::ErrorKind::NotFound`].
    async fn read_file(&self, path: &str) -> std::io::Result<String>;
}

/// Default transport: `tokio::fs` for files, `reqwest` for HTTP.
///
/// # Examples
///
/// ```rust
/// use configr::sources::DefaultTransport;
/// use std::time::Duration;
///
/// let transport = DefaultTransport::new().with_timeout(Duration::from_secs(10));
/// ```
#[derive(Clone, Default)]
pub struct DefaultTransport {
    timeout: Option<Duration>,
    #[cfg(feature = "remote")]
    client: Option<reqwest::Client>,
}

impl DefaultTransport {
    /// Create a transport without a request timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every HTTP request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a preconfigured `reqwest` client.
    #[cfg(feature = "remote")]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// The configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl Transport for DefaultTransport {
    #[cfg(feature = "remote")]
    async fn get(&self, url: &str, headers: &BTreeMap<String, String>) -> Result<HttpResponse> {
        let transport_error = |message: String| ConfigError::Transport {
            location: url.to_string(),
            message,
        };

        let client = self.client.clone().unwrap_or_default();
        let mut request = client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(format!("failed to read body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }

    #[cfg(not(feature = "remote"))]
    async fn get(&self, _url: &str, _headers: &BTreeMap<String, String>) -> Result<HttpResponse> {
        Err(ConfigError::FeatureNotEnabled("remote"))
    }

    async fn read_file(&self, path: &str) -> std::io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}
