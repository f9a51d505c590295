//! Worker loop wiring.

use std::time::Duration;

use anyhow::{Context, anyhow};
use embatch_core::job::JobStoreService;
use embatch_nats::NatsClient;
use embatch_nats::kv::NatsJobStore;
use embatch_sink::AggregationClient;
use embatch_worker::{BatchProcessor, JobExecutor, VectorizerEmbedder, WorkerHandles};

use crate::TRACING_TARGET_SERVER_SHUTDOWN;
use crate::config::Cli;

/// Spawns `--worker-concurrency` loops sharing one durable consumer.
///
/// Every loop owns its vectorizers and model clients and gets its own pull
/// subscription, so loops take jobs independently. The sink client and the
/// status store connection are shared.
pub async fn spawn(cli: &Cli, client: &NatsClient) -> anyhow::Result<WorkerHandles> {
    let sink = AggregationClient::new(cli.sink.clone())
        .context("failed to create the aggregation client")?
        .into_service();
    let store = NatsJobStore::new(client.clone())
        .await
        .context("failed to open the job status store")?;
    let store = JobStoreService::new(store);

    let queue = client
        .job_queue()
        .await
        .context("failed to open the job queue")?;

    let mut workers = Vec::with_capacity(cli.worker.worker_concurrency);
    for _ in 0..cli.worker.worker_concurrency {
        let processor = BatchProcessor::new(sink.clone())
            .with_embedder(VectorizerEmbedder::new(
                cli.vectorizer
                    .build_text()
                    .context("failed to build the text vectorizer")?,
            ))
            .with_embedder(VectorizerEmbedder::new(
                cli.vectorizer
                    .build_image()
                    .context("failed to build the image vectorizer")?,
            ));

        let consumer = queue
            .consumer(&cli.worker.worker_consumer)
            .await
            .context("failed to subscribe to the job queue")?;
        workers.push((consumer, JobExecutor::new(processor, store.clone())));
    }

    Ok(WorkerHandles::spawn(workers))
}

/// Stops the worker loops, aborting them if they outlive `timeout`.
pub async fn stop(handles: &mut WorkerHandles, timeout: Duration) -> anyhow::Result<()> {
    handles.shutdown();

    match tokio::time::timeout(timeout, handles.wait_all()).await {
        Ok(result) => result.context("worker loop failed"),
        Err(_) => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = timeout.as_secs(),
                "Worker loops did not stop in time"
            );
            handles.abort_all();
            Err(anyhow!(
                "worker loops did not stop within {}s",
                timeout.as_secs()
            ))
        }
    }
}
