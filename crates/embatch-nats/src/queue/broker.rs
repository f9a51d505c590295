//! Job broker on the NATS job queue.

use embatch_core::ServiceHealth;
use embatch_core::job::{JobBroker, JobEnvelope};

use super::JobQueue;
use crate::{NatsClient, Result};

/// Job broker publishing to the NATS job queue.
#[derive(Debug, Clone)]
pub struct NatsJobBroker {
    client: NatsClient,
    queue: JobQueue,
}

impl NatsJobBroker {
    /// Opens (or creates) the configured job queue.
    pub async fn new(client: NatsClient) -> Result<Self> {
        let queue = client.job_queue().await?;
        Ok(Self { client, queue })
    }

    /// Returns the underlying queue.
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }
}

#[async_trait::async_trait]
impl JobBroker for NatsJobBroker {
    async fn enqueue(&self, envelope: &JobEnvelope) -> embatch_core::Result<()> {
        Ok(self.queue.submit(envelope).await?)
    }

    async fn health_check(&self) -> embatch_core::Result<ServiceHealth> {
        Ok(self.client.health_check().await)
    }
}
