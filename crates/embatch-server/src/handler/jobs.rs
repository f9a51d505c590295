//! Batch submission and task status handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use embatch_core::Modality;
use embatch_core::job::JobStatus;

use super::request::ProcessBatch;
use super::response::TaskAccepted;
use crate::TRACING_TARGET_JOBS;
use crate::extract::{Json, Path};
use crate::handler::Result;
use crate::service::{JobService, ServiceState};

async fn submit(
    job_service: &JobService,
    modality: Modality,
    request: ProcessBatch,
) -> Result<(StatusCode, Json<TaskAccepted>)> {
    tracing::trace!(
        target: TRACING_TARGET_JOBS,
        modality = %modality,
        company_name = %request.company_name,
        items = request.items.len(),
        "submitting batch"
    );

    let job_id = job_service.submit(modality, request.into()).await?;
    Ok((StatusCode::OK, Json(TaskAccepted::new(job_id))))
}

/// Accepts a batch of text items.
#[tracing::instrument(skip_all)]
async fn process_text_batch(
    State(job_service): State<JobService>,
    Json(request): Json<ProcessBatch>,
) -> Result<(StatusCode, Json<TaskAccepted>)> {
    submit(&job_service, Modality::Text, request).await
}

/// Accepts a batch of base64-encoded images.
#[tracing::instrument(skip_all)]
async fn process_image_batch(
    State(job_service): State<JobService>,
    Json(request): Json<ProcessBatch>,
) -> Result<(StatusCode, Json<TaskAccepted>)> {
    submit(&job_service, Modality::Image, request).await
}

/// Reports the status of a task.
#[tracing::instrument(skip_all)]
async fn task_status(
    State(job_service): State<JobService>,
    Path(task_id): Path<String>,
) -> Result<(StatusCode, Json<JobStatus>)> {
    let status = job_service.status(&task_id).await?;

    tracing::debug!(
        target: TRACING_TARGET_JOBS,
        task_id = %task_id,
        state = %status.state(),
        "task status retrieved"
    );

    Ok((StatusCode::OK, Json(status)))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/process-text-batch", post(process_text_batch))
        .route("/process-text-batch/", post(process_text_batch))
        .route("/process-image-batch", post(process_image_batch))
        .route("/process-image-batch/", post(process_image_batch))
        .route("/task-status/{task_id}", get(task_status))
}
