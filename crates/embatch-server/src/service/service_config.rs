#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default maximum number of items per model invocation.
pub const DEFAULT_BATCH_SIZE: usize = 36;

/// Default maximum request body size in bytes (32 MiB).
pub const DEFAULT_MAX_REQUEST_BODY: usize = 32 * 1024 * 1024;

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Maximum number of items sent to the embedding model at once.
    ///
    /// Fixed per job at submission time.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)
    )]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum accepted request body size in bytes.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_REQUEST_BODY", default_value_t = DEFAULT_MAX_REQUEST_BODY)
    )]
    #[serde(default = "default_max_request_body")]
    pub max_request_body: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_request_body() -> usize {
    DEFAULT_MAX_REQUEST_BODY
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_request_body: DEFAULT_MAX_REQUEST_BODY,
        }
    }
}

impl ServiceConfig {
    /// Sets the chunk size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the maximum request body size.
    pub fn with_max_request_body(mut self, bytes: usize) -> Self {
        self.max_request_body = bytes;
        self
    }

    /// Lowers the request body limit to `bytes` if it is larger.
    ///
    /// A body bigger than the job broker's message limit could never be
    /// enqueued, so it is refused at the HTTP layer instead.
    pub fn with_body_limit_at_most(mut self, bytes: usize) -> Self {
        self.max_request_body = self.max_request_body.min(bytes);
        self
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be at least 1".to_string());
        }

        if self.max_request_body == 0 {
            return Err("Maximum request body size must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.batch_size, 36);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_is_invalid() {
        let config = ServiceConfig::default().with_batch_size(0);
        assert!(config.validate().is_err());

        let config = ServiceConfig::default().with_max_request_body(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_body_limit_is_clamped() {
        let config = ServiceConfig::default().with_body_limit_at_most(1024 * 1024);
        assert_eq!(config.max_request_body, 1024 * 1024);

        let config = ServiceConfig::default()
            .with_max_request_body(512)
            .with_body_limit_at_most(1024 * 1024);
        assert_eq!(config.max_request_body, 512);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }
}
