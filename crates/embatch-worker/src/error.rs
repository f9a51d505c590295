//! Worker error types.

use std::borrow::Cow;

/// Result type alias for worker operations.
pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

/// Failures of the worker loop itself.
///
/// Errors of individual jobs never surface here: they are recorded as the
/// job's `FAILURE` status instead.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Failed to subscribe to or read from the job queue.
    #[error("subscription failed: {0}")]
    Subscription(#[from] embatch_nats::Error),

    /// Failed to set up a worker.
    #[error("worker setup failed: {message}")]
    Setup {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl WorkerError {
    /// Creates a setup error with a message.
    pub fn setup(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Setup {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a setup error with a message and source.
    pub fn setup_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Setup {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
