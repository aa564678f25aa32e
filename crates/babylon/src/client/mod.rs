//! HTTP client library for a Babylon hub.
//!
//! Provides `HubClient` for test clients and peers talking to a hub over
//! HTTP. Used by the CLI `session` commands.

mod error;

pub use babylon_protocol::{
    BackendRegisterRequest, DeregisterRequest, ExecutionRequest, ExecutionResult, LogEntry,
    ReporterRegisterRequest, SessionContextRequest, SessionView,
};
pub use error::{ClientError, Result};

use reqwest::Client;

use crate::handlers::ReadyzResponse;
use crate::handlers::problem_details::ProblemDetails;
use crate::registry::CapabilityKind;

/// HTTP client for a Babylon hub.
#[derive(Debug, Clone)]
pub struct HubClient {
    base_url: String,
    http: Client,
}

impl HubClient {
    /// Create a new client pointing to the given base URL.
    ///
    /// Example: `HubClient::new("http://localhost:8080")`
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the server is healthy.
    ///
    /// Calls GET /readyz and returns the number of live sessions.
    pub async fn health(&self) -> Result<ReadyzResponse> {
        let url = format!("{}/readyz", self.base_url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::ServerUnhealthy {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    // ----------------------------------------------------------------------------
    // Sessions
    // ----------------------------------------------------------------------------

    /// Create a new session.
    pub async fn create_session(&self) -> Result<SessionView> {
        let url = format!("{}/session", self.base_url);
        let response = self.http.get(&url).send().await?;
        self.json_response(response).await
    }

    /// Get a session and its log.
    pub async fn get_session(&self, session_id: &str) -> Result<SessionView> {
        let url = format!("{}/session/{}", self.base_url, session_id);
        let response = self.http.get(&url).send().await?;
        self.json_response(response).await
    }

    /// End a session. Returns its final state.
    pub async fn end_session(&self, session_id: &str) -> Result<SessionView> {
        let url = format!("{}/session/{}", self.base_url, session_id);
        let response = self.http.delete(&url).send().await?;
        self.json_response(response).await
    }

    /// Append a client log line to a session.
    pub async fn log_message(&self, session_id: &str, message: &str) -> Result<LogEntry> {
        let url = format!("{}/session/{}", self.base_url, session_id);
        let body = SessionContextRequest::log_message(message);
        let response = self.http.post(&url).json(&body).send().await?;
        self.json_response(response).await
    }

    // ----------------------------------------------------------------------------
    // Execution
    // ----------------------------------------------------------------------------

    /// Execute an action on an actor or driver.
    pub async fn execute(
        &self,
        kind: CapabilityKind,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult> {
        let url = format!("{}/{}/execute", self.base_url, kind);
        let response = self.http.post(&url).json(request).send().await?;
        self.json_response(response).await
    }

    // ----------------------------------------------------------------------------
    // Self-Management
    // ----------------------------------------------------------------------------

    /// Register an actor or driver.
    pub async fn register_backend(
        &self,
        kind: CapabilityKind,
        request: &BackendRegisterRequest,
    ) -> Result<()> {
        let url = format!("{}/{}/", self.base_url, kind);
        let response = self.http.post(&url).json(request).send().await?;
        self.empty_response(response).await
    }

    /// Deregister an actor or driver by name.
    pub async fn deregister_backend(&self, kind: CapabilityKind, name: &str) -> Result<()> {
        let url = format!("{}/{}/", self.base_url, kind);
        let body = DeregisterRequest {
            name: name.to_string(),
        };
        let response = self.http.delete(&url).json(&body).send().await?;
        self.empty_response(response).await
    }

    /// Register a reporter.
    pub async fn register_reporter(&self, request: &ReporterRegisterRequest) -> Result<()> {
        let url = format!("{}/reporter/", self.base_url);
        let response = self.http.post(&url).json(request).send().await?;
        self.empty_response(response).await
    }

    /// Deregister a reporter by name.
    pub async fn deregister_reporter(&self, name: &str) -> Result<()> {
        let url = format!("{}/reporter/", self.base_url);
        let body = DeregisterRequest {
            name: name.to_string(),
        };
        let response = self.http.delete(&url).json(&body).send().await?;
        self.empty_response(response).await
    }

    // ----------------------------------------------------------------------------
    // Helpers
    // ----------------------------------------------------------------------------

    async fn parse_error(&self, response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();

        // Try to parse as problem+json
        if let Ok(problem) = response.json::<ProblemDetails>().await {
            ClientError::ApiError {
                status,
                message: problem.detail.unwrap_or(problem.title),
            }
        } else {
            ClientError::ApiError {
                status,
                message: format!("HTTP {}", status),
            }
        }
    }

    async fn json_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.parse_error(response).await)
        }
    }

    async fn empty_response(&self, response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.parse_error(response).await)
        }
    }
}
