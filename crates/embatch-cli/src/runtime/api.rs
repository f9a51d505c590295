//! HTTP API façade wiring.

use anyhow::Context;
use axum::Router;
use embatch_core::job::{JobBrokerService, JobStoreService};
use embatch_nats::NatsClient;
use embatch_nats::kv::NatsJobStore;
use embatch_nats::queue::NatsJobBroker;
use embatch_server::handler::routes;
use embatch_server::middleware::{RouterObservabilityExt, RouterRecoveryExt};
use embatch_server::service::ServiceState;

use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::Cli;

/// Builds the API router on the NATS job queue and status store.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Observability - request IDs and tracing spans
/// 3. Metrics - per-request latency and status
/// 4. Routes (innermost) - actual request handlers
pub async fn router(cli: &Cli, client: NatsClient) -> anyhow::Result<Router> {
    let max_payload = client.max_payload();
    let service = cli.service.clone().with_body_limit_at_most(max_payload);
    if service.max_request_body < cli.service.max_request_body {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            configured = cli.service.max_request_body,
            max_payload,
            "Request body limit lowered to the NATS message limit"
        );
    }

    let broker = NatsJobBroker::new(client.clone())
        .await
        .context("failed to open the job queue")?;
    let store = NatsJobStore::new(client)
        .await
        .context("failed to open the job status store")?;

    let state = ServiceState::new(
        service,
        JobBrokerService::new(broker),
        JobStoreService::new(store),
    );

    let router = routes(&state)
        .with_state(state)
        .with_metrics()
        .with_observability()
        .with_recovery(&cli.recovery);

    Ok(router)
}
