//! Aggregation sink client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use embatch_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default timeout for a single delivery attempt: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries after a failed delivery: none.
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Default delay before the first retry: 100 milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;

/// Default upper bound for a retry delay: 5 seconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

/// Default backoff multiplier.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Configuration for the aggregation sink client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct SinkConfig {
    /// URL the embeddings of finished jobs are POSTed to
    #[cfg_attr(feature = "config", arg(long = "aggregation-url", env = "AGGREGATION_URL"))]
    #[serde(default)]
    pub aggregation_url: Option<Url>,

    /// Timeout of a single delivery attempt in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "sink-timeout", env = "SINK_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub sink_timeout: u64,

    /// User-Agent header to send with deliveries
    #[cfg_attr(feature = "config", arg(long = "sink-user-agent", env = "SINK_USER_AGENT"))]
    #[serde(default)]
    pub sink_user_agent: Option<String>,

    /// Number of retries after a retryable delivery failure (0 disables retries)
    #[cfg_attr(
        feature = "config",
        arg(long = "sink-max-retries", env = "SINK_MAX_RETRIES", default_value = "0")
    )]
    #[serde(default)]
    pub sink_max_retries: u32,

    /// Delay before the first retry in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "sink-initial-backoff-ms",
            env = "SINK_INITIAL_BACKOFF_MS",
            default_value = "100"
        )
    )]
    #[serde(default = "default_initial_backoff_ms")]
    pub sink_initial_backoff_ms: u64,

    /// Upper bound for a single retry delay in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "sink-max-backoff-ms",
            env = "SINK_MAX_BACKOFF_MS",
            default_value = "5000"
        )
    )]
    #[serde(default = "default_max_backoff_ms")]
    pub sink_max_backoff_ms: u64,

    /// Multiplier applied to the delay after each retry
    #[cfg_attr(
        feature = "config",
        arg(
            long = "sink-backoff-multiplier",
            env = "SINK_BACKOFF_MULTIPLIER",
            default_value = "2.0"
        )
    )]
    #[serde(default = "default_backoff_multiplier")]
    pub sink_backoff_multiplier: f64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_initial_backoff_ms() -> u64 {
    DEFAULT_INITIAL_BACKOFF_MS
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

fn default_backoff_multiplier() -> f64 {
    DEFAULT_BACKOFF_MULTIPLIER
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            aggregation_url: None,
            sink_timeout: DEFAULT_TIMEOUT_SECS,
            sink_user_agent: None,
            sink_max_retries: DEFAULT_MAX_RETRIES,
            sink_initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            sink_max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            sink_backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl SinkConfig {
    /// Creates a configuration delivering to `url`.
    pub fn new(url: Url) -> Self {
        Self {
            aggregation_url: Some(url),
            ..Self::default()
        }
    }

    /// Returns the effective timeout, using the default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.sink_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.sink_timeout)
        }
    }

    /// Returns the effective user agent, using the default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.sink_user_agent
            .clone()
            .unwrap_or_else(|| format!("embatch/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Returns the retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.sink_max_retries == 0 {
            return RetryPolicy::no_retry();
        }

        RetryPolicy::exponential(self.sink_max_retries)
            .with_initial_backoff(Duration::from_millis(self.sink_initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(self.sink_max_backoff_ms))
            .with_multiplier(self.sink_backoff_multiplier)
    }

    /// Set the aggregation URL.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.aggregation_url = Some(url);
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.sink_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.sink_user_agent = Some(user_agent.into());
        self
    }

    /// Set the number of retries and their backoff bounds.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        self.sink_max_retries = max_retries;
        self.sink_initial_backoff_ms = initial_backoff_ms;
        self.sink_max_backoff_ms = max_backoff_ms;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        let Some(url) = &self.aggregation_url else {
            return Err("aggregation URL is required".to_string());
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "aggregation URL must use http or https, got '{}'",
                url.scheme()
            ));
        }

        if self.sink_max_retries > 0 {
            if self.sink_backoff_multiplier < 1.0 {
                return Err("sink backoff multiplier must be at least 1.0".to_string());
            }
            if self.sink_initial_backoff_ms > self.sink_max_backoff_ms {
                return Err("sink initial backoff cannot exceed the maximum backoff".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://aggregation:8000/embeddings").unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = SinkConfig::default();
        assert_eq!(config.sink_timeout, 30);
        assert_eq!(config.sink_max_retries, 0);
        assert!(config.aggregation_url.is_none());
        assert!(!config.retry_policy().is_enabled());
    }

    #[test]
    fn test_validate_requires_url() {
        assert!(SinkConfig::default().validate().is_err());
        assert!(SinkConfig::new(url()).validate().is_ok());

        let config = SinkConfig::new(Url::parse("ftp://aggregation/embeddings").unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_backoff_bounds() {
        let config = SinkConfig::new(url()).with_retries(3, 10_000, 1_000);
        assert!(config.validate().is_err());

        let mut config = SinkConfig::new(url()).with_retries(3, 100, 1_000);
        config.sink_backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy() {
        let policy = SinkConfig::new(url()).with_retries(2, 50, 400).retry_policy();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff_for(0), Duration::from_millis(50));
        assert_eq!(policy.backoff_for(10), Duration::from_millis(400));
    }

    #[test]
    fn test_effective_values() {
        let config = SinkConfig::new(url()).with_timeout(0);
        assert_eq!(
            config.effective_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert!(config.effective_user_agent().starts_with("embatch/"));
        assert_eq!(
            config.with_user_agent("custom/1.0").effective_user_agent(),
            "custom/1.0"
        );
    }
}
