use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{JobId, JobState};

/// Persisted state of a single job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier.
    pub job_id: JobId,
    /// Current lifecycle state.
    pub state: JobState,
    /// Sink response of a successful job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message of a failed job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the state was written.
    pub updated_at: Timestamp,
}

impl JobRecord {
    fn new(job_id: JobId, state: JobState) -> Self {
        Self {
            job_id,
            state,
            result: None,
            error: None,
            updated_at: Timestamp::now(),
        }
    }

    /// Record of an accepted job.
    pub fn pending(job_id: JobId) -> Self {
        Self::new(job_id, JobState::Pending)
    }

    /// Record of a job picked up by a worker.
    pub fn started(job_id: JobId) -> Self {
        Self::new(job_id, JobState::Started)
    }

    /// Record of a job whose embeddings were accepted by the sink.
    pub fn succeeded(job_id: JobId, result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::new(job_id, JobState::Success)
        }
    }

    /// Record of a failed job.
    pub fn failed(job_id: JobId, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(job_id, JobState::Failure)
        }
    }
}
