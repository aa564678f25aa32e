//! Babylon - A test-orchestration hub for pluggable actors, drivers and reporters.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod background;
pub mod build_info;
pub mod config;
pub mod transport;

// ============================================================================
// Server & HTTP
// ============================================================================

pub mod handlers;
pub mod server;

// ============================================================================
// Domain
// ============================================================================

pub mod dispatch;
pub mod notify;
pub mod registry;
pub mod session;

// ============================================================================
// Client
// ============================================================================

pub mod client;
