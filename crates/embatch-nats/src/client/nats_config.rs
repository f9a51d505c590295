//! NATS connection, queue and job state settings.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default server address.
pub const DEFAULT_NATS_URL: &str = "nats://127.0.0.1:4222";

/// Default stream name of the job queue.
pub const DEFAULT_JOB_QUEUE: &str = "embeddings";

/// Default lifetime of a job status entry in seconds.
pub const DEFAULT_JOB_STATUS_TTL: u64 = 3600;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;

/// Default bound on consecutive reconnect attempts.
pub const DEFAULT_MAX_RECONNECTS: usize = 10;

const CLIENT_NAME: &str = "embatch";
const PING_INTERVAL: Duration = Duration::from_secs(30);
const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(2);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Settings shared by the API and the workers to reach NATS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct NatsConfig {
    /// Server URL; several may be given comma-separated.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-url", env = "NATS_URL", default_value = DEFAULT_NATS_URL)
    )]
    pub nats_url: String,

    /// Token authentication.
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    pub nats_token: Option<String>,

    /// Connection name shown in server monitoring.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-client-name", env = "NATS_CLIENT_NAME")
    )]
    pub nats_client_name: Option<String>,

    /// Seconds to wait for the initial connection.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-connect-timeout", env = "NATS_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT)
    )]
    pub nats_connect_timeout: u64,

    /// Reconnect attempts before giving up; 0 retries forever.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-max-reconnects", env = "NATS_MAX_RECONNECTS", default_value_t = DEFAULT_MAX_RECONNECTS)
    )]
    pub nats_max_reconnects: usize,

    /// JetStream stream holding pending jobs.
    #[cfg_attr(
        feature = "config",
        arg(long = "job-queue", env = "JOB_QUEUE", default_value = DEFAULT_JOB_QUEUE)
    )]
    pub job_queue: String,

    /// Seconds a job status stays readable after its last update.
    #[cfg_attr(
        feature = "config",
        arg(long = "job-status-ttl", env = "JOB_STATUS_TTL", default_value_t = DEFAULT_JOB_STATUS_TTL)
    )]
    pub job_status_ttl: u64,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NATS_URL)
    }
}

impl NatsConfig {
    pub fn new(nats_url: impl Into<String>) -> Self {
        Self {
            nats_url: nats_url.into(),
            nats_token: None,
            nats_client_name: None,
            nats_connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            nats_max_reconnects: DEFAULT_MAX_RECONNECTS,
            job_queue: DEFAULT_JOB_QUEUE.to_owned(),
            job_status_ttl: DEFAULT_JOB_STATUS_TTL,
        }
    }

    /// Connection name reported to the server, `embatch` unless set.
    pub fn client_name(&self) -> &str {
        self.nats_client_name.as_deref().unwrap_or(CLIENT_NAME)
    }

    /// Individual server URLs.
    pub fn servers(&self) -> impl Iterator<Item = &str> {
        self.nats_url.split(',').map(str::trim)
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.nats_connect_timeout)
    }

    #[inline]
    pub fn ping_interval(&self) -> Duration {
        PING_INTERVAL
    }

    /// Reconnect bound, `None` when reconnecting forever.
    pub fn max_reconnects(&self) -> Option<usize> {
        (self.nats_max_reconnects > 0).then_some(self.nats_max_reconnects)
    }

    /// Delay before reconnect attempt `attempt`, doubling from two seconds
    /// up to thirty.
    pub fn reconnect_delay(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(8);
        RECONNECT_BASE_DELAY
            .saturating_mul(factor)
            .min(RECONNECT_MAX_DELAY)
    }

    #[inline]
    pub fn job_status_ttl(&self) -> Duration {
        Duration::from_secs(self.job_status_ttl)
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.nats_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_max_reconnects(mut self, max_reconnects: usize) -> Self {
        self.nats_max_reconnects = max_reconnects;
        self
    }

    #[must_use]
    pub fn with_job_queue(mut self, job_queue: impl Into<String>) -> Self {
        self.job_queue = job_queue.into();
        self
    }

    #[must_use]
    pub fn with_job_status_ttl(mut self, secs: u64) -> Self {
        self.job_status_ttl = secs;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(server) = self
            .servers()
            .find(|s| !(s.starts_with("nats://") || s.starts_with("tls://")))
        {
            return Err(format!(
                "NATS URL '{server}' must start with nats:// or tls://"
            ));
        }

        if self.nats_token.as_deref() == Some("") {
            return Err("NATS token cannot be empty".to_string());
        }

        if self.nats_connect_timeout == 0 {
            return Err("NATS connect timeout must be greater than 0".to_string());
        }

        let is_name_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if self.job_queue.is_empty() || !self.job_queue.chars().all(is_name_char) {
            return Err(format!(
                "Job queue '{}' may only contain letters, digits, '_' and '-'",
                self.job_queue
            ));
        }

        if self.job_status_ttl == 0 {
            return Err("Job status TTL must be greater than 0".to_string());
        }

        Ok(())
    }
}
