//! In-memory job broker and store.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use embatch_core::job::{JobBroker, JobEnvelope, JobId, JobRecord, JobStore};
use embatch_core::{Error, ErrorKind, Result, ServiceHealth};

use super::lock;

/// Job broker keeping envelopes in a FIFO queue.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobBroker {
    queue: Arc<Mutex<VecDeque<JobEnvelope>>>,
    unavailable: bool,
    max_payload: Option<usize>,
}

impl InMemoryJobBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every enqueue fail and health checks report unhealthy.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Refuses envelopes whose JSON encoding is larger than `bytes`.
    #[must_use]
    pub fn with_max_payload(mut self, bytes: usize) -> Self {
        self.max_payload = Some(bytes);
        self
    }

    /// Removes and returns the oldest envelope.
    pub fn pop(&self) -> Option<JobEnvelope> {
        lock(&self.queue).pop_front()
    }

    /// Removes and returns every queued envelope.
    pub fn drain(&self) -> Vec<JobEnvelope> {
        lock(&self.queue).drain(..).collect()
    }

    /// Returns the number of queued envelopes.
    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }
}

#[async_trait::async_trait]
impl JobBroker for InMemoryJobBroker {
    async fn enqueue(&self, envelope: &JobEnvelope) -> Result<()> {
        if self.unavailable {
            return Err(Error::queue("broker is unavailable"));
        }
        if let Some(limit) = self.max_payload {
            let size = serde_json::to_vec(envelope)
                .map_err(|error| Error::new(ErrorKind::Serialization).with_message("failed to encode job").with_source(error))?
                .len();
            if size > limit {
                return Err(Error::payload_too_large(format!(
                    "job of {size} bytes exceeds the {limit} byte message limit"
                )));
            }
        }
        lock(&self.queue).push_back(envelope.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        if self.unavailable {
            Ok(ServiceHealth::unhealthy("broker is unavailable"))
        } else {
            Ok(ServiceHealth::healthy())
        }
    }
}

/// Job store enforcing the lifecycle order in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    records: Arc<Mutex<HashMap<JobId, JobRecord>>>,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current record of a job.
    pub fn get(&self, job_id: &JobId) -> Option<JobRecord> {
        lock(&self.records).get(job_id).cloned()
    }

    /// Returns every stored record, in no particular order.
    pub fn records(&self) -> Vec<JobRecord> {
        lock(&self.records).values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl JobStore for InMemoryJobStore {
    async fn load(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        Ok(self.get(job_id))
    }

    async fn record(&self, record: &JobRecord) -> Result<bool> {
        let mut records = lock(&self.records);
        if let Some(current) = records.get(&record.job_id)
            && !current.state.can_transition_to(record.state)
        {
            return Ok(false);
        }

        records.insert(record.job_id, record.clone());
        Ok(true)
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

#[cfg(test)]
mod tests {
    use embatch_core::job::JobState;

    use super::*;

    #[tokio::test]
    async fn test_store_rejects_reverting_terminal_state() {
        let store = InMemoryJobStore::new();
        let job_id = JobId::new();

        assert!(store.record(&JobRecord::started(job_id)).await.unwrap());
        assert!(store.record(&JobRecord::failed(job_id, "boom")).await.unwrap());
        assert!(!store.record(&JobRecord::started(job_id)).await.unwrap());

        let record = store.load(&job_id).await.unwrap().unwrap();
        assert_eq!(record.state, JobState::Failure);
    }
}
