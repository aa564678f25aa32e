//! CLI command implementations.

pub mod serve;
pub mod session;
