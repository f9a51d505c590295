//! Shared NATS connection.
//!
//! `async-nats` multiplexes every operation over one TCP connection and
//! reconnects on its own, so a single [`NatsClient`] serves the API, the job
//! store and all worker loops.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_nats::{Client, ConnectOptions, jetstream};
use embatch_core::ServiceHealth;
use embatch_core::job::{JobId, JobRecord};
use serde_json::Value;
use tokio::time::timeout;

use super::nats_config::NatsConfig;
use crate::kv::{JobStatesBucket, KvStore};
use crate::queue::JobQueue;
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

/// Upper bound of a connectivity probe.
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Cloneable handle to a connected NATS server.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<Connection>,
}

#[derive(Debug)]
struct Connection {
    client: Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Connects within the configured timeout.
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate().map_err(Error::invalid_config)?;

        let reconnect = config.clone();
        let mut options = ConnectOptions::new()
            .name(config.client_name())
            .ping_interval(config.ping_interval())
            .connection_timeout(config.connect_timeout())
            .reconnect_delay_callback(move |attempt| reconnect.reconnect_delay(attempt));
        if let Some(token) = config.nats_token.clone() {
            options = options.token(token);
        }
        if let Some(max_reconnects) = config.max_reconnects() {
            options = options.max_reconnects(max_reconnects);
        }

        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            servers = %config.nats_url,
            "Connecting to NATS"
        );

        let deadline = config.connect_timeout();
        let client = timeout(
            deadline,
            async_nats::connect_with_options(config.nats_url.as_str(), options),
        )
        .await
        .map_err(|_| Error::timeout(deadline))?
        .map_err(|e| Error::Connection(Box::new(e)))?;

        let info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_id = %info.server_id,
            server_version = %info.version,
            max_payload = info.max_payload,
            "Connected to NATS"
        );

        let jetstream = jetstream::new(client.clone());
        Ok(Self {
            inner: Arc::new(Connection {
                client,
                jetstream,
                config,
            }),
        })
    }

    pub fn config(&self) -> &NatsConfig {
        &self.inner.config
    }

    /// Largest message the connected server accepts, in bytes.
    pub fn max_payload(&self) -> usize {
        self.inner.client.server_info().max_payload
    }

    /// Round-trips a flush to the server and returns the elapsed time.
    pub async fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        timeout(PING_TIMEOUT, self.inner.client.flush())
            .await
            .map_err(|_| Error::timeout(PING_TIMEOUT))?
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let elapsed = started.elapsed();
        tracing::trace!(
            target: TRACING_TARGET_CLIENT,
            elapsed_ms = elapsed.as_millis(),
            "NATS ping"
        );
        Ok(elapsed)
    }

    /// Reports connectivity as a service health.
    pub async fn health_check(&self) -> ServiceHealth {
        match self.ping().await {
            Ok(elapsed) => ServiceHealth::healthy()
                .with_response_time(elapsed)
                .with_metric(
                    "server_version",
                    Value::from(self.inner.client.server_info().version),
                ),
            Err(error) => ServiceHealth::unhealthy(error.to_string()),
        }
    }

    /// Opens the job state bucket, creating it with the configured status
    /// TTL on first use.
    pub async fn job_state_store(&self) -> Result<KvStore<JobId, JobRecord, JobStatesBucket>> {
        KvStore::open(&self.inner.jetstream, self.inner.config.job_status_ttl()).await
    }

    /// Opens the configured job queue, creating its stream on first use.
    pub async fn job_queue(&self) -> Result<JobQueue> {
        JobQueue::new(
            &self.inner.jetstream,
            &self.inner.config.job_queue,
            self.max_payload(),
        )
        .await
    }
}
