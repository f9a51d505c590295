//! Structured error handling for the embedding pipeline.

use std::borrow::Cow;

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur while accepting or running a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The submitted batch is malformed or empty.
    Validation,
    /// An item payload could not be turned into model input.
    Decode,
    /// The embedding model invocation failed or returned unusable output.
    ModelInference,
    /// The aggregation sink could not be reached or rejected the payload.
    SinkDelivery,
    /// The job broker could not accept or deliver work.
    Queue,
    /// The encoded job exceeds what the job broker accepts in one message.
    PayloadTooLarge,
    /// The job state store could not be read or written.
    Store,
    /// Configuration error.
    Configuration,
    /// Serialization/deserialization error.
    Serialization,
    /// Internal error.
    #[default]
    Internal,
}

impl ErrorKind {
    /// Returns `true` for failures of the backing infrastructure rather
    /// than of the submitted data.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Queue | Self::Store)
    }
}

/// Structured error type with classification.
///
/// The `Display` output (`[kind]: message`) is what a caller sees as the
/// failure status of a job, so messages are written for humans.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Primary error message.
    pub message: Option<Cow<'static, str>>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Creates a new error from a source error.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self {
            kind,
            message: None,
            source: Some(source.into()),
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Validation).with_message(message)
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Decode).with_message(message)
    }

    /// Creates a model inference error.
    pub fn model_inference(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ModelInference).with_message(message)
    }

    /// Creates a sink delivery error.
    pub fn sink_delivery(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::SinkDelivery).with_message(message)
    }

    /// Creates a job queue error.
    pub fn queue(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Queue).with_message(message)
    }

    /// Creates an error for a job too large for the job broker.
    pub fn payload_too_large(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge).with_message(message)
    }

    /// Creates a job store error.
    pub fn store(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Store).with_message(message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Configuration).with_message(message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal).with_message(message)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        let message = format!("JSON encoding failed: {error}");
        Self::from_source(ErrorKind::Serialization, error).with_message(message)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        let message = format!("blocking task did not complete: {error}");
        Self::from_source(ErrorKind::Internal, error).with_message(message)
    }
}
