//! Startup handshake with preconfigured backends and reporters.
//!
//! The hub offers its own callback URL to the peer's `serverConnect`
//! endpoint. The peer answers with its registration record, which is
//! installed only when the echoed secret matches the configured one.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use babylon_protocol::{ServerConnectRequest, ServerConnectResponse};

use super::backends::{BackendRegistration, BackendRegistry};
use super::kind::CapabilityKind;
use super::normalize_callback;
use super::reporters::{ReporterRegistration, ReporterRegistry};
use crate::config::PeerConfig;
use crate::transport::{Transport, TransportError};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("preconfigured peer is missing a callback")]
    MissingCallback,

    #[error("failed to encode handshake request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("peer answered handshake with status {0}")]
    Status(u16),

    #[error("invalid handshake response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("peer returned a secret that does not match the configured one")]
    SecretMismatch,
}

// ============================================================================
// Handshake
// ============================================================================

/// POST this hub's callback to `url` and parse the peer's answer.
pub async fn server_connect(
    transport: &dyn Transport,
    url: &str,
    server_callback: &str,
) -> Result<ServerConnectResponse, HandshakeError> {
    let request = ServerConnectRequest {
        callback: server_callback.to_string(),
    };
    let body = serde_json::to_vec(&request).map_err(HandshakeError::Encode)?;

    let response = transport.post_json(url, Bytes::from(body)).await?;
    if !response.is_ok() {
        return Err(HandshakeError::Status(response.status));
    }

    serde_json::from_slice(&response.body).map_err(HandshakeError::InvalidResponse)
}

/// Handshake with a configured backend and install it on success.
///
/// The registry is only touched after the handshake has completed.
pub async fn preconfigure_backend(
    registry: &BackendRegistry,
    transport: &dyn Transport,
    kind: CapabilityKind,
    name: &str,
    peer: &PeerConfig,
    server_callback: &str,
) -> Result<BackendRegistration, HandshakeError> {
    let callback = peer
        .callback
        .as_deref()
        .map(normalize_callback)
        .ok_or(HandshakeError::MissingCallback)?;

    let url = format!("{callback}{kind}/{name}/serverConnect");
    let answer = server_connect(transport, &url, server_callback).await?;
    verify_secret(peer.secret.as_deref(), answer.secret.as_deref())?;

    let registration = BackendRegistration::new(
        name,
        answer.capability_type,
        returned_or(&answer.callback, &callback),
        peer.secret.clone(),
    );
    registry.register(kind, registration.clone());

    info!(
        kind = %kind,
        backend = %name,
        capability_type = %registration.capability_type,
        "Server side backend registered"
    );
    Ok(registration)
}

/// Handshake with a configured reporter and install it on success.
pub async fn preconfigure_reporter(
    registry: &ReporterRegistry,
    transport: &dyn Transport,
    name: &str,
    peer: &PeerConfig,
    server_callback: &str,
) -> Result<ReporterRegistration, HandshakeError> {
    let callback = peer
        .callback
        .as_deref()
        .map(normalize_callback)
        .ok_or(HandshakeError::MissingCallback)?;

    let url = format!("{callback}reporter/{}/serverConnect", name.to_lowercase());
    let answer = server_connect(transport, &url, server_callback).await?;
    verify_secret(peer.secret.as_deref(), answer.secret.as_deref())?;

    let registration =
        ReporterRegistration::new(name, returned_or(&answer.callback, &callback), answer.live);
    registry.add(registration.clone());

    info!(reporter = %name, live = registration.live, "Server side reporter registered");
    Ok(registration)
}

/// An absent secret on either side compares as the empty string.
fn verify_secret(expected: Option<&str>, returned: Option<&str>) -> Result<(), HandshakeError> {
    let a = Sha256::digest(expected.unwrap_or_default().as_bytes());
    let b = Sha256::digest(returned.unwrap_or_default().as_bytes());
    if a == b {
        Ok(())
    } else {
        Err(HandshakeError::SecretMismatch)
    }
}

fn returned_or<'a>(returned: &'a str, configured: &'a str) -> &'a str {
    if returned.trim().is_empty() {
        configured
    } else {
        returned
    }
}

// ============================================================================
// Tests
// ============================================================================
