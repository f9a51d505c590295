//! Job state store backed by the `job_states` bucket.

use embatch_core::ServiceHealth;
use embatch_core::job::{JobId, JobRecord, JobStore};

use super::{JobStatesBucket, KvStore};
use crate::{NatsClient, Result, TRACING_TARGET_KV};

/// Number of compare-and-set attempts before a write is reported as failed.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Job state store on NATS KV.
///
/// Writes are compare-and-set on the entry revision, so concurrent writers
/// cannot move a job backwards.
#[derive(Debug, Clone)]
pub struct NatsJobStore {
    client: NatsClient,
    store: KvStore<JobId, JobRecord, JobStatesBucket>,
}

impl NatsJobStore {
    /// Opens (or creates) the job state bucket.
    pub async fn new(client: NatsClient) -> Result<Self> {
        let store = client.job_state_store().await?;
        Ok(Self { client, store })
    }

    /// Applies `record` if the stored state allows it.
    async fn try_record(&self, record: &JobRecord) -> Result<bool> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.store.read(&record.job_id).await?;
            if let Some(current) = &current
                && !current.value.state.can_transition_to(record.state)
            {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    job_id = %record.job_id,
                    current = %current.value.state,
                    rejected = %record.state,
                    "Ignoring backward job state transition"
                );
                return Ok(false);
            }

            let expected = current.map(|current| current.revision);
            let written = self.store.write(&record.job_id, record, expected).await;

            match written {
                Ok(_) => return Ok(true),
                Err(error) if error.is_conflict() => {
                    tracing::debug!(
                        target: TRACING_TARGET_KV,
                        job_id = %record.job_id,
                        attempt = attempt,
                        "Job state changed concurrently, retrying"
                    );
                }
                Err(error) => return Err(error),
            }
        }

        Err(crate::Error::kv_conflict(
            self.store.bucket_name(),
            record.job_id.to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl JobStore for NatsJobStore {
    async fn load(&self, job_id: &JobId) -> embatch_core::Result<Option<JobRecord>> {
        Ok(self.store.read(job_id).await?.map(|entry| entry.value))
    }

    async fn record(&self, record: &JobRecord) -> embatch_core::Result<bool> {
        Ok(self.try_record(record).await?)
    }

    async fn health_check(&self) -> embatch_core::Result<ServiceHealth> {
        Ok(self.client.health_check().await)
    }
}
