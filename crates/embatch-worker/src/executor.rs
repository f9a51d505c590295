//! Runs a job and records its lifecycle.

use std::time::Instant;

use embatch_core::job::{JobEnvelope, JobId, JobRecord, JobStoreService};

use crate::{BatchProcessor, TRACING_TARGET_WORKER};

/// Executes jobs and records their state transitions.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    processor: BatchProcessor,
    store: JobStoreService,
}

impl JobExecutor {
    /// Creates an executor.
    pub fn new(processor: BatchProcessor, store: JobStoreService) -> Self {
        Self { processor, store }
    }

    /// Runs a job to completion and returns its final record.
    ///
    /// Never fails: pipeline errors become a `FAILURE` record. A store that
    /// cannot be written is logged and does not stop the job. A job whose
    /// stored state refuses `STARTED` was already taken by a worker, so it
    /// is not run again and its stored record is returned.
    pub async fn execute(&self, envelope: &JobEnvelope) -> JobRecord {
        let started_at = Instant::now();
        let job_id = envelope.job_id;

        let started = JobRecord::started(job_id);
        if !self.write(&started).await {
            tracing::warn!(
                target: TRACING_TARGET_WORKER,
                job_id = %job_id,
                "Job already taken, skipping redelivery"
            );
            return self.stored(&job_id).await.unwrap_or(started);
        }

        tracing::info!(
            target: TRACING_TARGET_WORKER,
            job_id = %job_id,
            modality = %envelope.modality,
            items = envelope.batch.len(),
            batch_size = envelope.batch_size,
            "Processing job"
        );

        let record = match self.processor.process(envelope).await {
            Ok(response) => {
                tracing::info!(
                    target: TRACING_TARGET_WORKER,
                    job_id = %job_id,
                    elapsed_ms = started_at.elapsed().as_millis(),
                    "Job completed"
                );
                JobRecord::succeeded(job_id, response)
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_WORKER,
                    job_id = %job_id,
                    error = %error,
                    kind = error.kind_str(),
                    elapsed_ms = started_at.elapsed().as_millis(),
                    "Job failed"
                );
                JobRecord::failed(job_id, error.to_string())
            }
        };

        self.write(&record).await;
        record
    }

    /// Returns `false` only when the store refused the transition.
    async fn write(&self, record: &JobRecord) -> bool {
        match self.store.record(record).await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_WORKER,
                    job_id = %record.job_id,
                    state = %record.state,
                    error = %error,
                    "Failed to record job state"
                );
                true
            }
        }
    }

    async fn stored(&self, job_id: &JobId) -> Option<JobRecord> {
        self.store
            .load(job_id)
            .await
            .inspect_err(|error| {
                tracing::error!(
                    target: TRACING_TARGET_WORKER,
                    job_id = %job_id,
                    error = %error,
                    "Failed to load job state"
                );
            })
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use embatch_core::job::{JobState, JobStore};
    use embatch_core::model::EmbeddingService;
    use embatch_core::sink::AggregationService;
    use embatch_core::{Batch, BatchItem};
    use embatch_test::{InMemoryJobStore, MockEmbeddingModel, RecordingSink, word_level_tokenizer};
    use embatch_vectorizer::TextVectorizer;

    use super::*;
    use crate::VectorizerEmbedder;

    fn executor(model: MockEmbeddingModel, sink: RecordingSink, store: &InMemoryJobStore) -> JobExecutor {
        let vectorizer = TextVectorizer::new(
            word_level_tokenizer().unwrap(),
            EmbeddingService::new(model),
            77,
            "[PAD]",
        )
        .unwrap();
        let processor = BatchProcessor::new(AggregationService::new(sink))
            .with_embedder(VectorizerEmbedder::new(vectorizer));
        JobExecutor::new(processor, JobStoreService::new(store.clone()))
    }

    fn envelope() -> JobEnvelope {
        let batch = Batch::new(
            "acme",
            vec![BatchItem::text("a", "hello"), BatchItem::text("b", "world")],
        );
        JobEnvelope::new(batch, 36).unwrap()
    }

    #[tokio::test]
    async fn test_success_is_recorded() {
        let store = InMemoryJobStore::new();
        let envelope = envelope();
        store.record(&JobRecord::pending(envelope.job_id)).await.unwrap();

        let record = executor(MockEmbeddingModel::default(), RecordingSink::new(), &store)
            .execute(&envelope)
            .await;

        assert_eq!(record.state, JobState::Success);
        let stored = store.get(&envelope.job_id).unwrap();
        assert_eq!(stored.state, JobState::Success);
        assert_eq!(stored.result.unwrap()["company_name"], "acme");
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let store = InMemoryJobStore::new();
        let envelope = envelope();

        let record = executor(
            MockEmbeddingModel::default(),
            RecordingSink::new().failing("sink is down"),
            &store,
        )
        .execute(&envelope)
        .await;

        assert_eq!(record.state, JobState::Failure);
        let stored = store.get(&envelope.job_id).unwrap();
        assert_eq!(stored.state, JobState::Failure);
        assert!(stored.error.unwrap().contains("sink is down"));
        assert!(stored.result.is_none());
    }

    #[tokio::test]
    async fn test_finished_job_is_not_rerun() {
        let store = InMemoryJobStore::new();
        let sink = RecordingSink::new();
        let envelope = envelope();
        store
            .record(&JobRecord::failed(envelope.job_id, "[decode]: bad image"))
            .await
            .unwrap();

        let record = executor(MockEmbeddingModel::default(), sink.clone(), &store)
            .execute(&envelope)
            .await;

        assert_eq!(record.state, JobState::Failure);
        assert_eq!(record.error.as_deref(), Some("[decode]: bad image"));
        assert!(sink.deliveries().is_empty());
        assert_eq!(store.get(&envelope.job_id).unwrap().state, JobState::Failure);
    }
}
