//! Job lifecycle, records and the asynchronous execution facility.
//!
//! A job is created when a batch is accepted. The [`JobBroker`] carries its
//! [`JobEnvelope`] to a worker and the [`JobStore`] tracks its [`JobState`]
//! so callers can poll for a [`JobStatus`].

mod envelope;
mod job_id;
mod record;
mod service;
mod state;
mod status;

pub use envelope::JobEnvelope;
pub use job_id::JobId;
pub use record::JobRecord;
pub use service::{JobBrokerService, JobStoreService};
pub use state::JobState;
pub use status::JobStatus;

use crate::{Result, ServiceHealth};

/// Durable queue of pending jobs.
#[async_trait::async_trait]
pub trait JobBroker: Send + Sync {
    /// Enqueues one unit of work.
    async fn enqueue(&self, envelope: &JobEnvelope) -> Result<()>;

    /// Performs a health check on the broker.
    async fn health_check(&self) -> Result<ServiceHealth>;
}

/// Persistent job state.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Loads the current record of a job, if it is known and not expired.
    async fn load(&self, job_id: &JobId) -> Result<Option<JobRecord>>;

    /// Stores a new record for a job.
    ///
    /// Returns `false` without writing anything if the current state may
    /// not transition to the state of `record`.
    async fn record(&self, record: &JobRecord) -> Result<bool>;

    /// Performs a health check on the store.
    async fn health_check(&self) -> Result<ServiceHealth>;
}
