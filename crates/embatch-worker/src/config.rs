//! Worker configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default number of worker loops per process.
pub const DEFAULT_WORKER_CONCURRENCY: usize = 1;

/// Default durable consumer shared by all worker loops.
pub const DEFAULT_CONSUMER_NAME: &str = "embatch-workers";

/// Worker behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct WorkerConfig {
    /// Number of worker loops, each processing one job at a time.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "worker-concurrency",
            env = "WORKER_CONCURRENCY",
            default_value_t = DEFAULT_WORKER_CONCURRENCY
        )
    )]
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Durable consumer name shared by every worker loop.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "worker-consumer",
            env = "WORKER_CONSUMER",
            default_value = DEFAULT_CONSUMER_NAME
        )
    )]
    #[serde(default = "default_consumer_name")]
    pub worker_consumer: String,
}

fn default_worker_concurrency() -> usize {
    DEFAULT_WORKER_CONCURRENCY
}

fn default_consumer_name() -> String {
    DEFAULT_CONSUMER_NAME.to_owned()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: DEFAULT_WORKER_CONCURRENCY,
            worker_consumer: default_consumer_name(),
        }
    }
}

impl WorkerConfig {
    /// Sets the number of worker loops.
    #[must_use]
    pub fn with_worker_concurrency(mut self, worker_concurrency: usize) -> Self {
        self.worker_concurrency = worker_concurrency;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_concurrency == 0 {
            return Err("worker concurrency must be at least 1".to_string());
        }

        let valid_name = !self.worker_consumer.is_empty()
            && self
                .worker_consumer
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(format!(
                "invalid worker consumer name '{}'",
                self.worker_consumer
            ));
        }

        Ok(())
    }
}
