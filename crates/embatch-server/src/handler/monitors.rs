//! Service health handler.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use embatch_core::ServiceHealth;

use crate::TRACING_TARGET_HEALTH;
use crate::extract::Json;
use crate::service::{JobService, ServiceState};

/// Reports the combined health of the job broker and store.
///
/// Responds with `503` only when a backend is unhealthy; a degraded
/// service still accepts work.
#[tracing::instrument(skip_all)]
async fn health_status(
    State(job_service): State<JobService>,
) -> (StatusCode, Json<ServiceHealth>) {
    let health = job_service.health().await;

    let status_code = if health.is_available() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::info!(
        target: TRACING_TARGET_HEALTH,
        status = health.status.as_str(),
        status_code = status_code.as_u16(),
        "Health status response prepared"
    );

    (status_code, Json(health))
}

/// Returns a [`Router`] with all health monitoring routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}
