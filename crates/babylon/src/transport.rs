//! Outbound HTTP to backends and reporters.
//!
//! Every call the hub makes to a peer goes through [`Transport`], so the
//! dispatch and fan-out paths can be exercised without a network.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

// ============================================================================
// Types
// ============================================================================

/// Errors raised before a peer produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Status and raw body of a peer response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    /// Peers signal acceptance with exactly `200 OK`.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Outbound HTTP calls made by the hub.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body.
    async fn post_json(&self, url: &str, body: Bytes) -> Result<TransportResponse, TransportError>;

    /// Issue a DELETE with no body.
    async fn delete(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

// ============================================================================
// HttpTransport
// ============================================================================

/// [`Transport`] backed by a shared `reqwest` client with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose calls give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    async fn finish(
        url: &str,
        result: reqwest::Result<reqwest::Response>,
    ) -> Result<TransportResponse, TransportError> {
        let response = result.map_err(|e| request_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| request_error(url, e))?;
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: Bytes) -> Result<TransportResponse, TransportError> {
        let result = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;
        Self::finish(url, result).await
    }

    async fn delete(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let result = self.http.delete(url).send().await;
        Self::finish(url, result).await
    }
}

fn request_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

// ============================================================================
// Test Support
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
