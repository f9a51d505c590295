//! Error types for aggregation sink delivery.

use thiserror::Error;

/// Result type alias for sink client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Longest response body excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 256;

/// Error type for sink client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The client is not configured to deliver anywhere.
    #[error("aggregation sink is not configured: {0}")]
    Config(String),
    /// The HTTP request could not be completed.
    #[error("aggregation sink request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The sink answered with a non-success status.
    #[error("aggregation sink responded with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Excerpt of the response body.
        body: String,
    },
    /// The request body could not be encoded.
    #[error("failed to encode aggregation request: {0}")]
    Serde(#[from] serde_json::Error),
    /// The sink answered with a body that is not JSON.
    #[error("aggregation sink returned a non-JSON response: {0}")]
    InvalidResponse(#[source] serde_json::Error),
}

impl Error {
    /// Creates a status error, keeping a short excerpt of the body.
    pub fn status(status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_BODY_EXCERPT) {
            Some((end, _)) => format!("{}...", &body[..end]),
            None => body.to_owned(),
        };
        Self::Status { status, body }
    }

    /// Returns `true` if a later attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Reqwest(error) => error.is_timeout() || error.is_connect(),
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Config(_) | Self::Serde(_) | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<Error> for embatch_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Config(_) => embatch_core::Error::configuration(error.to_string()),
            _ => {
                let message = error.to_string();
                embatch_core::Error::sink_delivery(message).with_source(error)
            }
        }
    }
}
