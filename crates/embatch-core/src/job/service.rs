//! Broker and store wrappers with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::{JobBroker, JobEnvelope, JobId, JobRecord, JobStore};
use crate::{Result, ServiceHealth, TRACING_TARGET_JOB};

/// Job broker wrapper with observability.
#[derive(Clone)]
pub struct JobBrokerService {
    inner: Arc<dyn JobBroker>,
}

impl fmt::Debug for JobBrokerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobBrokerService").finish_non_exhaustive()
    }
}

impl JobBrokerService {
    /// Creates a new broker wrapper.
    pub fn new<B>(broker: B) -> Self
    where
        B: JobBroker + 'static,
    {
        Self {
            inner: Arc::new(broker),
        }
    }

    /// Enqueues one unit of work.
    pub async fn enqueue(&self, envelope: &JobEnvelope) -> Result<()> {
        let started_at = Instant::now();
        let result = self.inner.enqueue(envelope).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET_JOB,
                    job_id = %envelope.job_id,
                    modality = %envelope.modality,
                    items = envelope.batch.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Job enqueued"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_JOB,
                    job_id = %envelope.job_id,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Failed to enqueue job"
                );
            }
        }

        result
    }

    /// Performs a health check on the broker.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        self.inner.health_check().await
    }
}

/// Job store wrapper with observability.
#[derive(Clone)]
pub struct JobStoreService {
    inner: Arc<dyn JobStore>,
}

impl fmt::Debug for JobStoreService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobStoreService").finish_non_exhaustive()
    }
}

impl JobStoreService {
    /// Creates a new store wrapper.
    pub fn new<S>(store: S) -> Self
    where
        S: JobStore + 'static,
    {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Loads the current record of a job.
    pub async fn load(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        let result = self.inner.load(job_id).await;

        if let Err(error) = &result {
            tracing::error!(
                target: TRACING_TARGET_JOB,
                job_id = %job_id,
                error = %error,
                "Failed to load job record"
            );
        }

        result
    }

    /// Stores a new record, honoring the lifecycle order.
    pub async fn record(&self, record: &JobRecord) -> Result<bool> {
        let result = self.inner.record(record).await;

        match &result {
            Ok(true) => {
                tracing::debug!(
                    target: TRACING_TARGET_JOB,
                    job_id = %record.job_id,
                    state = %record.state,
                    "Job state recorded"
                );
            }
            Ok(false) => {
                tracing::warn!(
                    target: TRACING_TARGET_JOB,
                    job_id = %record.job_id,
                    state = %record.state,
                    "Rejected out-of-order job state"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_JOB,
                    job_id = %record.job_id,
                    state = %record.state,
                    error = %error,
                    "Failed to record job state"
                );
            }
        }

        result
    }

    /// Performs a health check on the store.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        self.inner.health_check().await
    }
}
