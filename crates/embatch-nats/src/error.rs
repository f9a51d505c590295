//! Failures of the NATS-backed queue and state store.

use std::time::Duration;

/// Result alias of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error raised by the NATS client, the job queue or the job state store.
///
/// Converts into [`embatch_core::Error`] as `Store` for bucket failures and
/// `Queue` for everything that touches the stream or the connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Could not connect, or the connection dropped.
    #[error("nats connection: {0}")]
    Connection(#[from] async_nats::Error),

    /// A job envelope or record was not valid JSON.
    #[error("malformed payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("nats operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Stream lookup, creation or publish failed.
    #[error("job queue {queue}: {reason}")]
    JobQueue { queue: String, reason: String },

    /// An encoded job is larger than the server accepts per message.
    #[error("job of {size} bytes exceeds the {limit} byte message limit of queue {queue}")]
    PayloadTooLarge {
        queue: String,
        size: usize,
        limit: usize,
    },

    /// Pull consumer setup or delivery failed.
    #[error("consumer {consumer}: {reason}")]
    Consumer { consumer: String, reason: String },

    #[error("bucket {bucket}: {operation} failed: {details}")]
    Kv {
        bucket: String,
        operation: String,
        details: String,
    },

    /// A compare-and-set write found a newer revision.
    #[error("bucket {bucket}: key {key} changed concurrently")]
    KvConflict { bucket: String, key: String },

    #[error("invalid nats configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    pub fn job_queue(queue: impl Into<String>, reason: impl ToString) -> Self {
        Self::JobQueue {
            queue: queue.into(),
            reason: reason.to_string(),
        }
    }

    pub fn consumer(consumer: impl Into<String>, reason: impl ToString) -> Self {
        Self::Consumer {
            consumer: consumer.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kv(bucket: impl Into<String>, operation: impl Into<String>, details: impl ToString) -> Self {
        Self::Kv {
            bucket: bucket.into(),
            operation: operation.into(),
            details: details.to_string(),
        }
    }

    pub fn kv_conflict(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::KvConflict {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Returns `true` if a compare-and-set write should be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::KvConflict { .. })
    }
}

impl From<Error> for embatch_core::Error {
    fn from(error: Error) -> Self {
        use embatch_core::ErrorKind;

        let kind = match &error {
            Error::Kv { .. } | Error::KvConflict { .. } => ErrorKind::Store,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Error::InvalidConfig { .. } => ErrorKind::Configuration,
            Error::Connection(_)
            | Error::Timeout { .. }
            | Error::JobQueue { .. }
            | Error::Consumer { .. } => ErrorKind::Queue,
        };

        embatch_core::Error::new(kind)
            .with_message(error.to_string())
            .with_source(error)
    }
}
