//! In-memory registries of backends (actors and drivers) and reporters.
//!
//! Each registry guards its map with a plain mutex that is held only for the
//! in-memory operation. Outbound calls, including the startup handshake in
//! [`handshake`], happen with no lock held.

mod backends;
mod handshake;
mod kind;
mod reporters;

use std::net::{IpAddr, SocketAddr};

pub use backends::{BackendRegistration, BackendRegistry};
pub use handshake::{HandshakeError, preconfigure_backend, preconfigure_reporter, server_connect};
pub use kind::CapabilityKind;
pub use reporters::{ReporterRegistration, ReporterRegistry};

// ============================================================================
// Callback URLs
// ============================================================================

/// Port assumed for a backend that registers without a callback.
pub const DEFAULT_BACKEND_CALLBACK_PORT: u16 = 8082;

/// Port assumed for a reporter that registers without a callback.
pub const DEFAULT_REPORTER_CALLBACK_PORT: u16 = 8080;

/// Ensure a callback base URL ends with `/`.
pub fn normalize_callback(callback: &str) -> String {
    if callback.ends_with('/') {
        callback.to_string()
    } else {
        format!("{callback}/")
    }
}

/// Build a callback base URL from a peer's observed address.
pub fn synthesize_callback(ip: IpAddr, port: u16) -> String {
    format!("http://{}/", SocketAddr::new(ip, port))
}

/// Use the supplied callback, or derive one from the peer address when blank.
pub fn resolve_callback(supplied: &str, peer: IpAddr, default_port: u16) -> String {
    let supplied = supplied.trim();
    if supplied.is_empty() {
        synthesize_callback(peer, default_port)
    } else {
        normalize_callback(supplied)
    }
}
