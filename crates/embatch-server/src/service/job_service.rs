//! Job submission and status façade.

use std::time::Instant;

use embatch_core::job::{
    JobBrokerService, JobEnvelope, JobId, JobRecord, JobStatus, JobStoreService,
};
use embatch_core::{Batch, Error, Modality, Result, ServiceHealth};

use crate::TRACING_TARGET_JOBS;

/// Accepts batches and reports job status.
///
/// Never runs the pipeline itself: accepted batches go to the broker and
/// workers drive every state change after `Pending`.
#[derive(Debug, Clone)]
pub struct JobService {
    broker: JobBrokerService,
    store: JobStoreService,
    batch_size: usize,
}

impl JobService {
    /// Creates a façade over a broker and a store.
    pub fn new(broker: JobBrokerService, store: JobStoreService, batch_size: usize) -> Self {
        Self {
            broker,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Returns the chunk size stamped on new jobs.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Validates and enqueues a batch, returning its job id.
    ///
    /// The batch must be non-empty and every item must be of `modality`.
    /// Nothing is recorded or enqueued for an invalid batch.
    pub async fn submit(&self, modality: Modality, batch: Batch) -> Result<JobId> {
        let envelope = JobEnvelope::new(batch, self.batch_size)?;
        if envelope.modality != modality {
            return Err(Error::validation(format!(
                "expected {modality} items but the batch contains {} items",
                envelope.modality
            )));
        }

        let job_id = envelope.job_id;
        self.store.record(&JobRecord::pending(job_id)).await?;

        if let Err(error) = self.broker.enqueue(&envelope).await {
            // The job never reaches a worker, so close it out here.
            let record = JobRecord::failed(job_id, error.to_string());
            if let Err(store_error) = self.store.record(&record).await {
                tracing::error!(
                    target: TRACING_TARGET_JOBS,
                    job_id = %job_id,
                    error = %store_error,
                    "Failed to close out unqueued job"
                );
            }
            return Err(error);
        }

        tracing::info!(
            target: TRACING_TARGET_JOBS,
            job_id = %job_id,
            modality = %modality,
            company_name = %envelope.batch.company_name,
            items = envelope.batch.len(),
            batch_size = envelope.batch_size,
            "Job accepted"
        );

        Ok(job_id)
    }

    /// Returns the caller-facing status of a task id.
    ///
    /// Ids that do not parse or are not known read as pending.
    pub async fn status(&self, task_id: &str) -> Result<JobStatus> {
        let Ok(job_id) = task_id.parse::<JobId>() else {
            tracing::debug!(
                target: TRACING_TARGET_JOBS,
                task_id = %task_id,
                "Unparseable task id reported as pending"
            );
            return Ok(JobStatus::pending());
        };

        let record = self.store.load(&job_id).await?;
        Ok(JobStatus::from_record(record))
    }

    /// Checks the broker and the store.
    pub async fn health(&self) -> ServiceHealth {
        let started_at = Instant::now();
        let (broker, store) =
            futures::join!(self.broker.health_check(), self.store.health_check());

        let report = |result: Result<ServiceHealth>| {
            result.unwrap_or_else(|error| ServiceHealth::unhealthy(error.to_string()))
        };

        ServiceHealth::combine([("broker", report(broker)), ("store", report(store))])
            .with_response_time(started_at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use embatch_core::job::{JobState, JobStore};
    use embatch_core::{BatchItem, ErrorKind, ServiceStatus};
    use embatch_test::{InMemoryJobBroker, InMemoryJobStore};

    use super::*;

    fn service(broker: &InMemoryJobBroker, store: &InMemoryJobStore) -> JobService {
        JobService::new(
            JobBrokerService::new(broker.clone()),
            JobStoreService::new(store.clone()),
            36,
        )
    }

    fn text_batch() -> Batch {
        Batch::new(
            "acme",
            vec![BatchItem::text("a", "hello"), BatchItem::text("b", "world")],
        )
    }

    #[tokio::test]
    async fn test_submit_records_pending_and_enqueues() {
        let broker = InMemoryJobBroker::new();
        let store = InMemoryJobStore::new();

        let job_id = service(&broker, &store)
            .submit(Modality::Text, text_batch())
            .await
            .unwrap();

        assert_eq!(store.get(&job_id).unwrap().state, JobState::Pending);
        let envelope = broker.pop().unwrap();
        assert_eq!(envelope.job_id, job_id);
        assert_eq!(envelope.batch_size, 36);
        assert_eq!(envelope.batch, text_batch());
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_batches() {
        let broker = InMemoryJobBroker::new();
        let store = InMemoryJobStore::new();
        let service = service(&broker, &store);

        let empty = service
            .submit(Modality::Text, Batch::new("acme", Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(empty.kind(), ErrorKind::Validation);

        let wrong_route = service
            .submit(Modality::Image, text_batch())
            .await
            .unwrap_err();
        assert_eq!(wrong_route.kind(), ErrorKind::Validation);

        assert!(broker.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_failure_closes_job() {
        let broker = InMemoryJobBroker::new().unavailable();
        let store = InMemoryJobStore::new();

        let error = service(&broker, &store)
            .submit(Modality::Text, text_batch())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Queue);

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, JobState::Failure);
        assert!(broker.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_batch_is_refused_and_closed() {
        let broker = InMemoryJobBroker::new().with_max_payload(256);
        let store = InMemoryJobStore::new();
        let batch = Batch::new("acme", vec![BatchItem::text("a", "x".repeat(1024))]);

        let error = service(&broker, &store)
            .submit(Modality::Text, batch)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::PayloadTooLarge);
        assert!(!error.kind().is_unavailable());

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, JobState::Failure);
        assert!(broker.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_ids_are_pending() {
        let service = service(&InMemoryJobBroker::new(), &InMemoryJobStore::new());

        let status = service.status(&JobId::new().to_string()).await.unwrap();
        assert_eq!(status, JobStatus::pending());

        let status = service.status("definitely-not-a-uuid").await.unwrap();
        assert_eq!(status, JobStatus::pending());
    }

    #[tokio::test]
    async fn test_status_reads_store() {
        let store = InMemoryJobStore::new();
        let job_id = JobId::new();
        store
            .record(&JobRecord::failed(job_id, "[decode]: bad image"))
            .await
            .unwrap();

        let status = service(&InMemoryJobBroker::new(), &store)
            .status(&job_id.to_string())
            .await
            .unwrap();
        assert_eq!(status.state(), JobState::Failure);
    }

    #[tokio::test]
    async fn test_health_reports_unavailable_broker() {
        let healthy = service(&InMemoryJobBroker::new(), &InMemoryJobStore::new())
            .health()
            .await;
        assert_eq!(healthy.status, ServiceStatus::Healthy);

        let unhealthy = service(
            &InMemoryJobBroker::new().unavailable(),
            &InMemoryJobStore::new(),
        )
        .health()
        .await;
        assert_eq!(unhealthy.status, ServiceStatus::Unhealthy);
        assert!(unhealthy.message.unwrap().contains("broker"));
    }
}
