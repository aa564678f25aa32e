//! HTTP request handlers.

mod backends;
mod health;
pub(crate) mod problem_details;
mod reporters;
mod sessions;
mod version;

use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;

pub use backends::{
    deregister_actor, deregister_driver, execute_actor, execute_driver, register_actor,
    register_driver,
};
pub use health::{ReadyzResponse, livez, readyz};
pub use reporters::{deregister_reporter, register_reporter};
pub use sessions::{create_session, delete_session, get_session, update_session};
pub use version::version;

/// Decode a JSON request body. Any failure is a 400 problem response,
/// regardless of the request content type.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        problem_details::bad_request(format!("invalid request body: {e}")).into_response()
    })
}
