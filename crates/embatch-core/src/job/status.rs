use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{JobRecord, JobState};

/// Caller-facing status of a job.
///
/// Serialized with a `state` tag, for example
/// `{"state": "PENDING", "status": "Pending..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Not started yet, or unknown.
    Pending {
        /// Fixed progress message.
        status: String,
    },
    /// Running on a worker.
    Started {
        /// Fixed progress message.
        status: String,
    },
    /// Finished; carries the sink response verbatim.
    Success {
        /// Parsed sink response.
        result: Value,
    },
    /// Failed; carries the error message.
    Failure {
        /// Human-readable error message.
        status: String,
    },
}

impl JobStatus {
    /// Status message of a pending job.
    pub const PENDING_MESSAGE: &'static str = "Pending...";
    /// Status message of a running job.
    pub const STARTED_MESSAGE: &'static str = "Processing...";

    /// Status of a job that has not started or is unknown.
    pub fn pending() -> Self {
        Self::Pending {
            status: Self::PENDING_MESSAGE.to_owned(),
        }
    }

    /// Maps a stored record to the caller-facing status.
    ///
    /// A missing record reads as pending.
    pub fn from_record(record: Option<JobRecord>) -> Self {
        let Some(record) = record else {
            return Self::pending();
        };

        match record.state {
            JobState::Pending => Self::pending(),
            JobState::Started => Self::Started {
                status: Self::STARTED_MESSAGE.to_owned(),
            },
            JobState::Success => Self::Success {
                result: record.result.unwrap_or(Value::Null),
            },
            JobState::Failure => Self::Failure {
                status: record.error.unwrap_or_default(),
            },
        }
    }

    /// Returns the lifecycle state behind this status.
    #[must_use]
    pub const fn state(&self) -> JobState {
        match self {
            Self::Pending { .. } => JobState::Pending,
            Self::Started { .. } => JobState::Started,
            Self::Success { .. } => JobState::Success,
            Self::Failure { .. } => JobState::Failure,
        }
    }
}
