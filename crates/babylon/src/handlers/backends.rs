//! Actor and driver HTTP handlers.
//!
//! Both kinds share one implementation; the public handlers only pick the
//! [`CapabilityKind`].

use std::net::SocketAddr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use babylon_protocol::{BackendRegisterRequest, DeregisterRequest, ExecutionRequest};

use super::{parse_json, problem_details};
use crate::registry::{
    BackendRegistration, CapabilityKind, DEFAULT_BACKEND_CALLBACK_PORT, resolve_callback,
};
use crate::server::AppState;

// ============================================================================
// Execution
// ============================================================================

/// POST /actor/execute
pub async fn execute_actor(State(state): State<AppState>, body: Bytes) -> Response {
    execute(&state, CapabilityKind::Actor, &body).await
}

/// POST /driver/execute
pub async fn execute_driver(State(state): State<AppState>, body: Bytes) -> Response {
    execute(&state, CapabilityKind::Driver, &body).await
}

async fn execute(state: &AppState, kind: CapabilityKind, body: &[u8]) -> Response {
    let req: ExecutionRequest = match parse_json(body) {
        Ok(req) => req,
        Err(response) => return response,
    };

    match state.services.dispatcher.dispatch(kind, req).await {
        Ok(outcome) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            outcome.body,
        )
            .into_response(),
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() || status == StatusCode::FAILED_DEPENDENCY {
                warn!(kind = %kind, error = %e, "Dispatch failed");
            }
            problem_details::problem(status, e.to_string()).into_response()
        }
    }
}

// ============================================================================
// Self-Management
// ============================================================================

/// POST /actor/
pub async fn register_actor(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    register(&state, CapabilityKind::Actor, addr, &body)
}

/// POST /driver/
pub async fn register_driver(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    register(&state, CapabilityKind::Driver, addr, &body)
}

/// DELETE /actor/
pub async fn deregister_actor(State(state): State<AppState>, body: Bytes) -> Response {
    deregister(&state, CapabilityKind::Actor, &body)
}

/// DELETE /driver/
pub async fn deregister_driver(State(state): State<AppState>, body: Bytes) -> Response {
    deregister(&state, CapabilityKind::Driver, &body)
}

fn register(state: &AppState, kind: CapabilityKind, peer: SocketAddr, body: &[u8]) -> Response {
    let req: BackendRegisterRequest = match parse_json(body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    if req.name.trim().is_empty() {
        return problem_details::bad_request(format!("{kind} name is required")).into_response();
    }

    let callback = resolve_callback(&req.callback, peer.ip(), DEFAULT_BACKEND_CALLBACK_PORT);
    let registration =
        BackendRegistration::new(req.name, req.capability_type, &callback, req.secret);

    let replaced = state
        .services
        .backends
        .register(kind, registration.clone())
        .is_some();

    info!(
        kind = %kind,
        backend = %registration.name,
        capability_type = %registration.capability_type,
        callback = %registration.callback,
        replaced,
        "Backend registered"
    );
    Json(registration).into_response()
}

fn deregister(state: &AppState, kind: CapabilityKind, body: &[u8]) -> Response {
    let req: DeregisterRequest = match parse_json(body) {
        Ok(req) => req,
        Err(response) => return response,
    };

    if state.services.backends.deregister(kind, &req.name) {
        info!(kind = %kind, backend = %req.name, "Backend deregistered");
    }
    StatusCode::OK.into_response()
}
