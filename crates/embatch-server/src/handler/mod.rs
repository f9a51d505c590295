//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod error;
mod jobs;
mod monitors;
mod request;
mod response;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::request::ProcessBatch;
pub use crate::handler::response::{ErrorResponse, TaskAccepted};
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes.
///
/// The request body limit comes from the service configuration.
pub fn routes(state: &ServiceState) -> Router<ServiceState> {
    Router::new()
        .merge(jobs::routes())
        .merge(monitors::routes())
        .layer(DefaultBodyLimit::max(state.config().max_request_body))
        .fallback(fallback)
}
