//! Job queue on a JetStream work-queue stream.

use std::time::Duration;

use async_nats::jetstream::{self, consumer, stream};
use embatch_core::Modality;
use embatch_core::job::JobEnvelope;

use super::JobConsumer;
use crate::{Error, Result, TRACING_TARGET_QUEUE};

/// How long a delivered job may stay unacknowledged before redelivery.
const ACK_WAIT: Duration = Duration::from_secs(300);

/// Maximum number of deliveries of one job.
const MAX_DELIVER: i64 = 3;

/// Job queue for distributed job processing.
///
/// Jobs are published to `jobs.<queue>.<modality>` on the `JOBS_<QUEUE>`
/// stream. The stream uses work-queue retention, so an acknowledged job is
/// removed and never delivered twice.
#[derive(Debug, Clone)]
pub struct JobQueue {
    jetstream: jetstream::Context,
    queue_name: String,
    stream_name: String,
    max_payload: usize,
}

/// Returns the stream name of a queue.
fn stream_name(queue_name: &str) -> String {
    format!("JOBS_{}", queue_name.to_uppercase().replace('-', "_"))
}

/// Rejects an encoded job the server would refuse as a single message.
fn check_payload_size(queue_name: &str, size: usize, limit: usize) -> Result<()> {
    if size > limit {
        return Err(Error::PayloadTooLarge {
            queue: queue_name.to_owned(),
            size,
            limit,
        });
    }
    Ok(())
}

/// Returns the subject jobs of a modality are published to.
fn subject(queue_name: &str, modality: Modality) -> String {
    format!("jobs.{queue_name}.{modality}")
}

impl JobQueue {
    /// Create or open a job queue.
    ///
    /// `max_payload` is the largest message the server accepts; bigger jobs
    /// are refused before publishing.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_QUEUE)]
    pub(crate) async fn new(
        jetstream: &jetstream::Context,
        queue_name: &str,
        max_payload: usize,
    ) -> Result<Self> {
        let stream_name = stream_name(queue_name);

        match jetstream.get_stream(&stream_name).await {
            Ok(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_QUEUE,
                    stream = %stream_name,
                    "Using existing job stream"
                );
            }
            Err(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_QUEUE,
                    stream = %stream_name,
                    queue_name = %queue_name,
                    "Creating new job stream"
                );
                let stream_config = stream::Config {
                    name: stream_name.clone(),
                    description: Some(format!("Embedding job queue: {queue_name}")),
                    subjects: vec![format!("jobs.{queue_name}.>")],
                    retention: stream::RetentionPolicy::WorkQueue,
                    ..Default::default()
                };
                jetstream
                    .create_stream(stream_config)
                    .await
                    .map_err(|e| Error::job_queue(queue_name, e))?;
            }
        }

        Ok(Self {
            jetstream: jetstream.clone(),
            queue_name: queue_name.to_owned(),
            stream_name,
            max_payload,
        })
    }

    /// Returns the queue name.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Returns the largest encoded job this queue accepts, in bytes.
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Publishes a job and waits for the stream to persist it.
    #[tracing::instrument(skip(self, envelope), target = TRACING_TARGET_QUEUE)]
    pub async fn submit(&self, envelope: &JobEnvelope) -> Result<()> {
        let subject = subject(&self.queue_name, envelope.modality);
        let payload = serde_json::to_vec(envelope)?;
        let size = payload.len();
        check_payload_size(&self.queue_name, size, self.max_payload)?;

        self.jetstream
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| Error::job_queue(&self.queue_name, e))?
            .await
            .map_err(|e| Error::job_queue(&self.queue_name, e))?;

        tracing::debug!(
            target: TRACING_TARGET_QUEUE,
            job_id = %envelope.job_id,
            subject = %subject,
            size_bytes = size,
            "Submitted job to queue"
        );
        Ok(())
    }

    /// Opens a pull subscription on the durable consumer `consumer_name`.
    ///
    /// Subscriptions opened with the same name share one consumer, so each
    /// job goes to exactly one of them.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_QUEUE)]
    pub async fn consumer(&self, consumer_name: &str) -> Result<JobConsumer> {
        let consumer_config = consumer::pull::Config {
            durable_name: Some(consumer_name.to_owned()),
            description: Some(format!("Embedding workers on queue {}", self.queue_name)),
            filter_subject: format!("jobs.{}.>", self.queue_name),
            ack_wait: ACK_WAIT,
            max_deliver: MAX_DELIVER,
            ..Default::default()
        };

        let stream = self
            .jetstream
            .get_stream(&self.stream_name)
            .await
            .map_err(|e| Error::job_queue(&self.queue_name, e))?;

        let pull_consumer = stream
            .get_or_create_consumer(consumer_name, consumer_config)
            .await
            .map_err(|e| Error::consumer(consumer_name, e))?;

        let messages = pull_consumer
            .messages()
            .await
            .map_err(|e| Error::consumer(consumer_name, e))?;

        tracing::debug!(
            target: TRACING_TARGET_QUEUE,
            consumer = %consumer_name,
            stream = %self.stream_name,
            "Subscribed to job queue"
        );

        Ok(JobConsumer::new(consumer_name, messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_name() {
        assert_eq!(stream_name("embeddings"), "JOBS_EMBEDDINGS");
        assert_eq!(stream_name("image-jobs"), "JOBS_IMAGE_JOBS");
    }

    #[test]
    fn test_oversized_job_is_refused() {
        assert!(check_payload_size("embeddings", 1024, 1024).is_ok());

        let error = check_payload_size("embeddings", 1025, 1024).unwrap_err();
        assert!(matches!(
            error,
            Error::PayloadTooLarge {
                size: 1025,
                limit: 1024,
                ..
            }
        ));
        let error: embatch_core::Error = error.into();
        assert_eq!(error.kind(), embatch_core::ErrorKind::PayloadTooLarge);
    }

    #[test]
    fn test_subject() {
        assert_eq!(subject("embeddings", Modality::Text), "jobs.embeddings.text");
        assert_eq!(subject("embeddings", Modality::Image), "jobs.embeddings.image");
    }
}
