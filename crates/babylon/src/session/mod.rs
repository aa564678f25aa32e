//! Session lifecycle for Babylon.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐  Arc<Session>  ┌─────────────────────┐
//!  │ SessionStore │────────────────▶ Session             │  (per-session mutex:
//!  │ (id → entry) │                │  log, last activity │   appends to different
//!  └──────┬───────┘                └─────────────────────┘   sessions never contend)
//!         │ log_appended / session_ended
//!         ▼
//!  ┌──────────────┐
//!  │ SessionEvents│  implemented by the fan-out notifier
//!  └──────────────┘
//! ```
//!
//! - **SessionStore** — creates, reads, appends to and tears down sessions.
//!   Teardown marks the session terminated, hands the final snapshot to
//!   [`SessionEvents::session_ended`], then removes it from the map.
//! - **Sweeper** — periodic task that tears down sessions idle longer than the
//!   inactivity window, through the same path as an explicit delete.

mod error;
mod store;
mod sweeper;

pub use error::{SessionError, parse_session_id};
pub use store::{SessionEvents, SessionStore};
pub use sweeper::{SweeperConfig, SweeperHandle, spawn_sweeper};

#[cfg(test)]
pub(crate) use store::testing;
