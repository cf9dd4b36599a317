//! HTTP transport seam
//!
//! The channel manager talks to the network only through the [`Transport`]
//! trait, so the request deadline, response validation and caching can be
//! exercised without a live server. [`HttpTransport`] is the `reqwest`-backed
//! implementation used in production.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Budget for a single request, from send until the response body is read
pub const REQUEST_DEADLINE: Duration = Duration::from_millis(1000);

/// HTTP methods used against the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Patch,
}

/// An outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the first header with the given name, ignoring case
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response as received, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Errors raised by the transport itself (not by response statuses)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete in time
    #[error("request timed out")]
    Timeout,

    /// Connection, protocol or body read failure
    #[error("request failed: {0}")]
    Failed(String),
}

/// Sends requests and returns status plus body
///
/// Cancellation is cooperative: dropping the returned future abandons the
/// request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Sends a request, abandoning it if no response arrives within `deadline`
///
/// The timer lives inside the returned future and is released on every exit
/// path, including when the transport finishes first or fails.
pub async fn send_with_deadline(
    transport: &dyn Transport,
    request: TransportRequest,
    deadline: Duration,
) -> Result<TransportResponse, TransportError> {
    match tokio::time::timeout(deadline, transport.send(request)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout),
    }
}

/// Transport backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Create a new HttpTransport with default settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a new HttpTransport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Patch => self.client.patch(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(TransportResponse { status, body })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Failed(error.to_string())
    }
}
