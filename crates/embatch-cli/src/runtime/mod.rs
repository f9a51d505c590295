//! Runs the components selected by `--mode` until a shutdown signal.
//!
//! Startup order: connect to NATS, spawn the worker loops, then serve the
//! API. On shutdown the API stops accepting requests first, then the worker
//! loops finish their current job.

mod api;
mod workers;

use anyhow::Context;
use embatch_nats::NatsClient;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::Cli;
use crate::server::{ServerError, serve_http, shutdown_signal};

/// Runs the configured components until shutdown.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = NatsClient::connect(cli.nats.clone())
        .await
        .context("failed to connect to NATS")?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let mut workers = if cli.mode.runs_workers() {
        Some(workers::spawn(&cli, &client).await?)
    } else {
        None
    };

    let served = if cli.mode.runs_api() {
        let router = api::router(&cli, client).await?;
        serve_http(router, &cli.server, shutdown.clone().cancelled_owned())
            .await
            .inspect_err(log_recovery_hint)
            .context("HTTP server failed")
    } else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Running workers only, waiting for a shutdown signal"
        );
        shutdown.cancelled().await;
        Ok(())
    };

    if let Some(handles) = workers.as_mut() {
        workers::stop(handles, cli.server.shutdown_timeout()).await?;
    }

    served
}

fn log_recovery_hint(error: &ServerError) {
    if let Some(suggestion) = error.suggestion() {
        tracing::info!(
            target: TRACING_TARGET_SERVER_STARTUP,
            code = error.error_code(),
            recoverable = error.is_recoverable(),
            suggestion,
            "Recovery suggestion"
        );
    }
}
