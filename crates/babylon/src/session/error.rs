use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(Uuid),

    #[error("session id is missing")]
    MissingId,

    #[error("malformed session id: {0}")]
    MalformedId(String),
}

/// Parse a textual session id. Surrounding whitespace is ignored.
pub fn parse_session_id(raw: &str) -> Result<Uuid, SessionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SessionError::MissingId);
    }
    Uuid::parse_str(raw).map_err(|_| SessionError::MalformedId(raw.to_string()))
}
