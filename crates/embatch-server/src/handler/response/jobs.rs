use embatch_core::job::JobId;
use serde::{Deserialize, Serialize};

/// Acknowledgement of an accepted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAccepted {
    /// Identifier to poll the status endpoint with.
    pub task_id: JobId,
    /// Fixed acknowledgement text.
    pub status: String,
}

impl TaskAccepted {
    /// Acknowledgement text of every accepted batch.
    pub const MESSAGE: &'static str = "Processing started";

    /// Creates the acknowledgement of a new job.
    pub fn new(task_id: JobId) -> Self {
        Self {
            task_id,
            status: Self::MESSAGE.to_owned(),
        }
    }
}
