//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── mode: Mode                    # all, api or worker
//! ├── server: ServerConfig          # Host, port, shutdown
//! ├── recovery: RecoveryConfig      # Request timeout
//! ├── service: ServiceConfig        # Batch size, body limit
//! ├── nats: NatsConfig              # Job queue and status store
//! ├── worker: WorkerConfig          # Worker loops
//! ├── sink: SinkConfig              # Aggregation service
//! └── vectorizer: VectorizerConfig  # Tokenizer, image size, model server
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod server;

use std::process;

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use embatch_nats::NatsConfig;
use embatch_server::middleware::RecoveryConfig;
use embatch_server::service::ServiceConfig;
use embatch_sink::SinkConfig;
use embatch_vectorizer::VectorizerConfig;
use embatch_worker::WorkerConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Which parts of the service this process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// HTTP API and worker loops.
    #[default]
    All,
    /// HTTP API only.
    Api,
    /// Worker loops only.
    Worker,
}

impl Mode {
    /// Returns `true` if the HTTP API is served.
    #[must_use]
    pub const fn runs_api(self) -> bool {
        matches!(self, Self::All | Self::Api)
    }

    /// Returns `true` if worker loops are spawned.
    #[must_use]
    pub const fn runs_workers(self) -> bool {
        matches!(self, Self::All | Self::Worker)
    }
}

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "embatch")]
#[command(about = "Asynchronous batch embedding service")]
#[command(version)]
pub struct Cli {
    /// Components to run in this process.
    #[arg(long, env = "MODE", value_enum, default_value_t = Mode::All)]
    #[serde(default)]
    pub mode: Mode,

    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Request timeout configuration.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,

    /// API façade configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// NATS connection, job queue and status store.
    #[clap(flatten)]
    pub nats: NatsConfig,

    /// Worker loop configuration.
    #[clap(flatten)]
    pub worker: WorkerConfig,

    /// Aggregation sink configuration.
    #[clap(flatten)]
    pub sink: SinkConfig,

    /// Text and image vectorizer configuration.
    #[clap(flatten)]
    pub vectorizer: VectorizerConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is read before clap parses arguments, so its values are
    /// picked up as environment defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Validates the configuration of every component the mode runs.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.nats
            .validate()
            .map_err(|e| anyhow!(e))
            .context("invalid NATS configuration")?;

        if self.mode.runs_api() {
            self.server
                .validate()
                .context("invalid server configuration")?;
            self.recovery
                .validate()
                .map_err(|e| anyhow!(e))
                .context("invalid recovery configuration")?;
            self.service
                .validate()
                .map_err(|e| anyhow!(e))
                .context("invalid service configuration")?;
        }

        if self.mode.runs_workers() {
            self.worker
                .validate()
                .map_err(|e| anyhow!(e))
                .context("invalid worker configuration")?;
            if self.sink.aggregation_url.is_none() {
                return Err(anyhow!("--aggregation-url is required to run workers"));
            }
            self.sink
                .validate()
                .map_err(|e| anyhow!(e))
                .context("invalid sink configuration")?;
            self.vectorizer
                .validate()
                .map_err(|e| anyhow!(e))
                .context("invalid vectorizer configuration")?;
        }

        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            mode = ?self.mode,
            nats_url = %self.nats.nats_url,
            job_queue = %self.nats.job_queue,
            job_status_ttl_secs = self.nats.job_status_ttl,
            "Runtime configuration"
        );

        if self.mode.runs_api() {
            self.server.log();
            tracing::info!(
                target: TRACING_TARGET_CONFIG,
                batch_size = self.service.batch_size,
                max_request_body = self.service.max_request_body,
                request_timeout_secs = self.recovery.request_timeout,
                "API configuration"
            );
        }

        if self.mode.runs_workers() {
            tracing::info!(
                target: TRACING_TARGET_CONFIG,
                worker_concurrency = self.worker.worker_concurrency,
                worker_consumer = %self.worker.worker_consumer,
                aggregation_url = ?self.sink.aggregation_url.as_ref().map(|url| url.as_str()),
                sink_max_retries = self.sink.sink_max_retries,
                inference_url = ?self.vectorizer.inference.inference_url.as_ref().map(|url| url.as_str()),
                text_model = %self.vectorizer.inference.text_model,
                image_model = %self.vectorizer.inference.image_model,
                "Worker configuration"
            );
        }
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("embatch").chain(args.iter().copied()))
    }

    #[test]
    fn api_mode_needs_no_worker_settings() {
        let cli = parse(&["--mode", "api"]);
        assert_eq!(cli.mode, Mode::Api);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn worker_mode_requires_aggregation_url() {
        let cli = parse(&[
            "--mode",
            "worker",
            "--tokenizer-path",
            "tokenizer.json",
            "--inference-url",
            "http://triton:8000",
        ]);
        let error = cli.validate().unwrap_err();
        assert!(error.to_string().contains("aggregation-url"));
    }

    #[test]
    fn worker_mode_with_complete_settings() {
        let cli = parse(&[
            "--mode",
            "worker",
            "--aggregation-url",
            "http://aggregator:8000/embeddings",
            "--tokenizer-path",
            "tokenizer.json",
            "--inference-url",
            "http://triton:8000",
            "--worker-concurrency",
            "4",
        ]);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.worker.worker_concurrency, 4);
        assert!(!cli.mode.runs_api());
    }

    #[test]
    fn default_mode_runs_everything() {
        let mode = Mode::default();
        assert!(mode.runs_api());
        assert!(mode.runs_workers());
    }
}
