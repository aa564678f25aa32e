//! Reporter self-management handlers.

use std::net::SocketAddr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use babylon_protocol::{DeregisterRequest, ReporterRegisterRequest};

use super::{parse_json, problem_details};
use crate::registry::{DEFAULT_REPORTER_CALLBACK_PORT, ReporterRegistration, resolve_callback};
use crate::server::AppState;

/// POST /reporter/
pub async fn register_reporter(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    let req: ReporterRegisterRequest = match parse_json(&body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    if req.name.trim().is_empty() {
        return problem_details::bad_request("reporter name is required").into_response();
    }

    let callback = resolve_callback(&req.callback, addr.ip(), DEFAULT_REPORTER_CALLBACK_PORT);
    let reporter = ReporterRegistration::new(req.name, &callback, req.live);
    state.services.reporters.add(reporter.clone());

    info!(
        reporter = %reporter.name,
        callback = %reporter.callback,
        live = reporter.live,
        "Reporter registered"
    );
    Json(reporter).into_response()
}

/// DELETE /reporter/
pub async fn deregister_reporter(State(state): State<AppState>, body: Bytes) -> Response {
    let req: DeregisterRequest = match parse_json(&body) {
        Ok(req) => req,
        Err(response) => return response,
    };

    if state.services.reporters.remove(&req.name) {
        info!(reporter = %req.name, "Reporter deregistered");
    }
    StatusCode::OK.into_response()
}
