//! Session HTTP handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;
use uuid::Uuid;

use babylon_protocol::{CLIENT_LOG_CATEGORY, CONTEXT_LOG_MESSAGE, SessionContextRequest};

use super::{parse_json, problem_details};
use crate::server::AppState;
use crate::session::parse_session_id;

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.services.sessions.create();
    (StatusCode::CREATED, Json(view))
}

/// GET /session/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> impl IntoResponse {
    let id = match session_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.services.sessions.get(&id) {
        Some(view) => Json(view).into_response(),
        None => problem_details::not_found("session not found").into_response(),
    }
}

/// DELETE /session/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> impl IntoResponse {
    let id = match session_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.services.sessions.delete(&id) {
        Some(view) => Json(view).into_response(),
        None => problem_details::not_found("session not found").into_response(),
    }
}

/// POST /session/{id}
pub async fn update_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let id = match session_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if !state.services.sessions.contains(&id) {
        return problem_details::not_found("session not found").into_response();
    }

    let req: SessionContextRequest = match parse_json(&body) {
        Ok(req) => req,
        Err(response) => return response,
    };

    if req.context_type != CONTEXT_LOG_MESSAGE {
        debug!(session_id = %id, context_type = %req.context_type, "Rejected context update");
        return problem_details::bad_request(format!(
            "unsupported context type '{}'",
            req.context_type
        ))
        .into_response();
    }

    match state
        .services
        .sessions
        .append_log(&id, CLIENT_LOG_CATEGORY, req.log_message)
    {
        Ok(entry) => Json(entry).into_response(),
        Err(_) => problem_details::not_found("session not found").into_response(),
    }
}

fn session_id(raw: &str) -> Result<Uuid, Response> {
    parse_session_id(raw)
        .map_err(|e| problem_details::bad_request(e.to_string()).into_response())
}
