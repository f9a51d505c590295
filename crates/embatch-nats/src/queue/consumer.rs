//! Pull subscription delivering job envelopes.

use async_nats::jetstream::{self, consumer};
use embatch_core::job::JobEnvelope;
use futures::StreamExt;

use crate::{Error, Result, TRACING_TARGET_QUEUE};

/// A pull subscription on the job queue.
pub struct JobConsumer {
    consumer_name: String,
    messages: consumer::pull::Stream,
}

impl std::fmt::Debug for JobConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobConsumer")
            .field("consumer_name", &self.consumer_name)
            .finish_non_exhaustive()
    }
}

impl JobConsumer {
    pub(crate) fn new(consumer_name: &str, messages: consumer::pull::Stream) -> Self {
        Self {
            consumer_name: consumer_name.to_owned(),
            messages,
        }
    }

    /// Waits for the next job.
    ///
    /// Messages that do not hold a job envelope are acknowledged and
    /// dropped. Returns `None` once the subscription ends.
    pub async fn next(&mut self) -> Result<Option<JobDelivery>> {
        while let Some(message) = self.messages.next().await {
            let message = message.map_err(|e| Error::consumer(&self.consumer_name, e))?;

            match serde_json::from_slice::<JobEnvelope>(&message.payload) {
                Ok(envelope) => return Ok(Some(JobDelivery { envelope, message })),
                Err(error) => {
                    tracing::error!(
                        target: TRACING_TARGET_QUEUE,
                        consumer = %self.consumer_name,
                        subject = %message.subject,
                        error = %error,
                        "Dropping malformed job message"
                    );
                    if let Err(error) = message.ack().await {
                        tracing::warn!(
                            target: TRACING_TARGET_QUEUE,
                            error = %error,
                            "Failed to ack malformed job message"
                        );
                    }
                }
            }
        }

        Ok(None)
    }
}

/// A job received from the queue, not yet acknowledged.
pub struct JobDelivery {
    envelope: JobEnvelope,
    message: jetstream::Message,
}

impl std::fmt::Debug for JobDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDelivery")
            .field("job_id", &self.envelope.job_id)
            .finish_non_exhaustive()
    }
}

impl JobDelivery {
    /// Returns the job envelope.
    pub fn envelope(&self) -> &JobEnvelope {
        &self.envelope
    }

    /// Acknowledges the job, removing it from the queue.
    pub async fn ack(&self) -> Result<()> {
        self.message.ack().await?;
        Ok(())
    }

    /// Consumes the delivery, returning the job envelope.
    pub fn into_envelope(self) -> JobEnvelope {
        self.envelope
    }
}
