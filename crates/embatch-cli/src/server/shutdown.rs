//! Process signal handling.

use std::future::pending;

use tokio::signal;

use super::TRACING_TARGET_SHUTDOWN;

/// Resolves on the first SIGINT or SIGTERM.
///
/// A signal whose handler cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let interrupt = async {
        match signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(error) => {
                tracing::error!(target: TRACING_TARGET_SHUTDOWN, %error, "SIGINT handler unavailable");
                pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(error) => {
                tracing::error!(target: TRACING_TARGET_SHUTDOWN, %error, "SIGTERM handler unavailable");
                pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<&'static str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };

    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        signal = received,
        "Shutdown requested"
    );
}
