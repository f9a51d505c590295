//! Worker loops consuming the job queue.

use std::time::Duration;

use embatch_core::job::JobEnvelope;
use embatch_nats::queue::JobConsumer;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{JobExecutor, Result, TRACING_TARGET_WORKER, WorkerError};

/// Pause after a failed receive before polling again.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// A stream of jobs to run.
#[async_trait::async_trait]
pub trait JobSource: Send + 'static {
    /// Waits for the next job, acknowledging it before it is returned.
    ///
    /// Returns `None` once no more jobs will arrive.
    async fn next_job(&mut self) -> Result<Option<JobEnvelope>>;
}

#[async_trait::async_trait]
impl JobSource for JobConsumer {
    async fn next_job(&mut self) -> Result<Option<JobEnvelope>> {
        let Some(delivery) = self.next().await? else {
            return Ok(None);
        };

        // A job is never redelivered once taken: a crash mid-job leaves it
        // in STARTED rather than running it twice.
        if let Err(error) = delivery.ack().await {
            tracing::error!(
                target: TRACING_TARGET_WORKER,
                job_id = %delivery.envelope().job_id,
                error = %error,
                "Failed to ack job"
            );
        }

        Ok(Some(delivery.into_envelope()))
    }
}

/// A single worker loop.
///
/// Runs one job at a time until cancelled. A running job is always finished
/// before the loop stops.
pub struct Worker<S: JobSource> {
    index: usize,
    source: S,
    executor: JobExecutor,
    cancel_token: CancellationToken,
}

impl<S: JobSource> Worker<S> {
    /// Creates a worker loop.
    pub fn new(
        index: usize,
        source: S,
        executor: JobExecutor,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            index,
            source,
            executor,
            cancel_token,
        }
    }

    /// Spawns the worker as a background task.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Runs the worker loop, processing jobs as they arrive.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_WORKER,
            worker = self.index,
            "Starting worker"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET_WORKER,
                        worker = self.index,
                        "Shutdown requested, stopping worker"
                    );
                    break;
                }

                result = self.source.next_job() => match result {
                    Ok(Some(envelope)) => {
                        self.executor.execute(&envelope).await;
                    }
                    Ok(None) => {
                        tracing::warn!(
                            target: TRACING_TARGET_WORKER,
                            worker = self.index,
                            "Job source closed, stopping worker"
                        );
                        break;
                    }
                    Err(error) => {
                        tracing::error!(
                            target: TRACING_TARGET_WORKER,
                            worker = self.index,
                            error = %error,
                            "Failed to receive job"
                        );
                        tokio::time::sleep(RECEIVE_BACKOFF).await;
                    }
                },
            }
        }

        Ok(())
    }
}

/// Handles for the background worker loops.
pub struct WorkerHandles {
    handles: Vec<JoinHandle<Result<()>>>,
    cancel_token: CancellationToken,
}

impl WorkerHandles {
    /// Spawns one worker loop per `(source, executor)` pair.
    pub fn spawn<S, I>(workers: I) -> Self
    where
        S: JobSource,
        I: IntoIterator<Item = (S, JobExecutor)>,
    {
        let cancel_token = CancellationToken::new();
        let handles: Vec<_> = workers
            .into_iter()
            .enumerate()
            .map(|(index, (source, executor))| {
                Worker::new(index, source, executor, cancel_token.child_token()).spawn()
            })
            .collect();

        tracing::info!(
            target: TRACING_TARGET_WORKER,
            workers = handles.len(),
            "Worker loops spawned"
        );

        Self {
            handles,
            cancel_token,
        }
    }

    /// Returns the number of worker loops.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no worker loop was spawned.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Requests graceful shutdown of all workers.
    ///
    /// Workers finish their current job before stopping.
    pub fn shutdown(&self) {
        tracing::info!(
            target: TRACING_TARGET_WORKER,
            "Initiating graceful shutdown of worker loops"
        );
        self.cancel_token.cancel();
    }

    /// Aborts all worker tasks immediately.
    pub fn abort_all(&self) {
        tracing::warn!(
            target: TRACING_TARGET_WORKER,
            "Aborting all worker loops immediately"
        );
        self.cancel_token.cancel();
        self.handles.iter().for_each(JoinHandle::abort);
    }

    /// Checks if any worker has finished (possibly due to error).
    pub fn any_finished(&self) -> bool {
        self.handles.iter().any(JoinHandle::is_finished)
    }

    /// Waits for all workers to complete.
    ///
    /// Returns the first error encountered, if any. Dropping the future early
    /// leaves the remaining handles in place for [`abort_all`](Self::abort_all).
    pub async fn wait_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for handle in &mut self.handles {
            let result = handle
                .await
                .map_err(|e| WorkerError::setup_with_source("worker task panicked", e))
                .and_then(|result| result);
            if let Err(error) = result {
                first_error.get_or_insert(error);
            }
        }

        tracing::info!(
            target: TRACING_TARGET_WORKER,
            "All worker loops stopped"
        );

        first_error.map_or(Ok(()), Err)
    }
}
