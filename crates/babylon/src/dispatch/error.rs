use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::registry::CapabilityKind;
use crate::session::SessionError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing session id")]
    MissingSession,

    #[error("malformed session id: {0}")]
    MalformedSession(String),

    #[error("unknown session id: {0}")]
    UnknownSession(Uuid),

    #[error("no supported {kind} for type '{capability_type}'")]
    NoBackend {
        kind: CapabilityKind,
        capability_type: String,
    },

    #[error("failed to encode execution request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid response from backend: {0}")]
    InvalidResponse(#[source] serde_json::Error),
}

impl DispatchError {
    /// HTTP status surfaced to the dispatch caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::MissingSession
            | DispatchError::MalformedSession(_)
            | DispatchError::UnknownSession(_) => StatusCode::BAD_REQUEST,
            DispatchError::NoBackend { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::Encode(_) | DispatchError::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DispatchError::InvalidResponse(_) => StatusCode::FAILED_DEPENDENCY,
        }
    }
}

impl From<SessionError> for DispatchError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::MissingId => DispatchError::MissingSession,
            SessionError::MalformedId(raw) => DispatchError::MalformedSession(raw),
            SessionError::NotFound(id) => DispatchError::UnknownSession(id),
        }
    }
}
