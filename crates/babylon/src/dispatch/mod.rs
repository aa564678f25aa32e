//! Routing of execution requests to actors and drivers.
//!
//! One routine serves both capability kinds. The sequence for a request is:
//!
//! 1. validate the session id and resolve the session
//! 2. resolve a backend of the requested capability type
//! 3. log the action to the session (failing if it has since ended), then
//!    POST it to the backend
//! 4. parse the backend result and log its outcome (and message, if any)
//!
//! Every failure returns immediately; nothing after a failed step runs.

mod error;

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use babylon_protocol::{ExecutionRequest, ExecutionResult};

use crate::registry::{BackendRegistration, BackendRegistry, CapabilityKind};
use crate::session::{SessionStore, parse_session_id};
use crate::transport::Transport;

pub use error::DispatchError;

/// Parsed backend result together with the body the backend sent.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub result: ExecutionResult,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct Dispatcher {
    sessions: SessionStore,
    backends: Arc<BackendRegistry>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(
        sessions: SessionStore,
        backends: Arc<BackendRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            sessions,
            backends,
            transport,
        }
    }

    pub async fn dispatch(
        &self,
        kind: CapabilityKind,
        request: ExecutionRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let session_id = parse_session_id(&request.session)?;
        if !self.sessions.contains(&session_id) {
            return Err(DispatchError::UnknownSession(session_id));
        }

        self.forward(kind, session_id, request).await
    }

    /// Resolve the backend, record the start entry and call the backend.
    ///
    /// The start entry is the authoritative session check: a session torn
    /// down since `dispatch` looked it up fails here, before any outbound
    /// traffic.
    async fn forward(
        &self,
        kind: CapabilityKind,
        session_id: Uuid,
        request: ExecutionRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let backend = self
            .backends
            .find_by_type(kind, &request.capability_type)
            .ok_or_else(|| DispatchError::NoBackend {
                kind,
                capability_type: request.capability_type.clone(),
            })?;

        let body = serde_json::to_vec(&request).map_err(DispatchError::Encode)?;

        self.sessions.append_log(
            &session_id,
            format!("system::{kind}::{}", backend.name),
            format!("Executing action '{}'.", request.action),
        )?;

        info!(
            session_id = %session_id,
            kind = %kind,
            backend = %backend.name,
            action = %request.action,
            "Dispatching action"
        );

        let url = backend.endpoint(kind, "execute");
        let response = self.transport.post_json(&url, Bytes::from(body)).await?;

        let result: ExecutionResult =
            serde_json::from_slice(&response.body).map_err(DispatchError::InvalidResponse)?;

        self.record_outcome(&session_id, kind, &backend, &result);

        Ok(DispatchOutcome {
            result,
            body: response.body,
        })
    }

    fn record_outcome(
        &self,
        session_id: &Uuid,
        kind: CapabilityKind,
        backend: &BackendRegistration,
        result: &ExecutionResult,
    ) {
        let outcome = if result.success { "SUCCESS" } else { "FAILED" };
        self.log(
            session_id,
            &format!("system::{kind}::{}", backend.name),
            format!("{} action: {outcome}", kind.title()),
        );

        if !result.message.is_empty() {
            self.log(
                session_id,
                &format!("message::{kind}::{}", backend.name),
                result.message.clone(),
            );
        }
    }

    /// The session may have been swept while the backend was working.
    fn log(&self, session_id: &Uuid, category: &str, message: String) {
        if let Err(e) = self.sessions.append_log(session_id, category, message) {
            warn!(session_id = %session_id, error = %e, "Dropped session log entry");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
