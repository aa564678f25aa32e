//! Wire types for communication between the Babylon hub and its peers.
//!
//! This crate defines the JSON contract spoken over HTTP between the hub,
//! test clients, backends (actors and drivers) and reporters. Use it to
//! build a backend or reporter in Rust.
//!
//! # Protocol Overview
//!
//! - **Client → Hub**: session management and execution requests
//!   ([`ExecutionRequest`], [`SessionContextRequest`])
//! - **Hub → Backend**: forwarded execution requests, end-of-session notices
//!   and the startup handshake ([`ServerConnectRequest`])
//! - **Backend → Hub**: execution results ([`ExecutionResult`]) and
//!   registration ([`BackendRegisterRequest`], [`DeregisterRequest`])
//! - **Hub → Reporter**: live log pushes ([`LivePush`]) and final session
//!   reports ([`SessionView`])
//!
//! # Example: Minimal Backend Result
//!
//! ```
//! use babylon_protocol::ExecutionResult;
//!
//! let result = ExecutionResult::success("clicked");
//! let json = serde_json::to_string(&result).unwrap();
//! assert_eq!(json, r#"{"success":true,"message":"clicked"}"#);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Context type accepted by `POST /session/{id}` for appending a log line.
pub const CONTEXT_LOG_MESSAGE: &str = "logMessage";

/// Log category used for entries supplied directly by a test client.
pub const CLIENT_LOG_CATEGORY: &str = "client";

// ============================================================================
// Execution (Client → Hub → Backend)
// ============================================================================

/// Request to execute an action on a backend.
///
/// Sent by a test client to `/actor/execute` or `/driver/execute` and
/// forwarded verbatim to the selected backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Capability type used to select the backend.
    #[serde(rename = "type", default)]
    pub capability_type: String,

    /// Name of the action to perform.
    #[serde(default)]
    pub action: String,

    /// Free-form action parameters.
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,

    /// Identifier of the session the action belongs to.
    #[serde(default)]
    pub session: String,
}

/// Result returned by a backend after executing an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl ExecutionResult {
    /// Create a successful result.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Create a failed result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// ============================================================================
// Registration (Backend/Reporter → Hub)
// ============================================================================

/// Self-registration of an actor or driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRegisterRequest {
    pub name: String,

    /// Capability type this backend handles.
    #[serde(rename = "type", default)]
    pub capability_type: String,

    /// Base URL the hub calls back on. Empty means "derive from my address".
    #[serde(default)]
    pub callback: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Self-registration of a reporter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterRegisterRequest {
    pub name: String,

    #[serde(default)]
    pub callback: String,

    /// Whether the reporter wants every log entry pushed as it happens.
    #[serde(default)]
    pub live: bool,
}

/// Deregistration by name (backends and reporters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregisterRequest {
    pub name: String,
}

// ============================================================================
// Startup Handshake (Hub → Backend/Reporter)
// ============================================================================

/// Offer of the hub's own callback URL, sent to a preconfigured peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConnectRequest {
    pub callback: String,
}

/// Peer answer to a [`ServerConnectRequest`].
///
/// Backends fill `type`; reporters fill `live`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConnectResponse {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub capability_type: String,

    #[serde(default)]
    pub callback: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(default)]
    pub live: bool,
}

// ============================================================================
// Sessions
// ============================================================================

/// A single session log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,

    /// Free-form category tag, e.g. `system::driver::web` or `client`.
    #[serde(rename = "type")]
    pub category: String,

    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn now(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category: category.into(),
            message: message.into(),
        }
    }
}

/// Session context (the ordered log).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

/// Public JSON view of a session.
///
/// Returned by the session endpoints and posted to reporters as the final
/// report when the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub uuid: Uuid,
    #[serde(default)]
    pub context: SessionContext,
}

/// Client request to add context to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContextRequest {
    /// Context type; only [`CONTEXT_LOG_MESSAGE`] is recognized.
    #[serde(rename = "type", default)]
    pub context_type: String,

    #[serde(rename = "logMessage", default)]
    pub log_message: String,
}

impl SessionContextRequest {
    /// Build a log-message context request.
    pub fn log_message(message: impl Into<String>) -> Self {
        Self {
            context_type: CONTEXT_LOG_MESSAGE.to_string(),
            log_message: message.into(),
        }
    }
}

// ============================================================================
// Reporting (Hub → Reporter)
// ============================================================================

/// A single log entry pushed to a live reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivePush {
    /// Session identifier in canonical UUID form.
    pub session: String,
    pub message: LogEntry,
}

// ============================================================================
// Tests
// ============================================================================
