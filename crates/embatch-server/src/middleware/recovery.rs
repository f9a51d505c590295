//! Converts timeouts, panics and middleware failures into JSON errors.

use std::any::Any;
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::response::{IntoResponse, Response};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::catch_panic::CatchPanicLayer;

use crate::handler::ErrorKind;
use crate::{TRACING_TARGET_RECOVERY_ERROR, TRACING_TARGET_RECOVERY_PANIC};

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Request deadline applied by [`RouterRecoveryExt::with_recovery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct RecoveryConfig {
    /// Seconds a request may run before it is answered with a 500.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT)
    )]
    pub request_timeout: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self::with_timeout_secs(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl RecoveryConfig {
    pub fn with_timeout_secs(request_timeout: u64) -> Self {
        Self { request_timeout }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.request_timeout {
            0 => Err("Request timeout must be greater than 0".to_string()),
            _ => Ok(()),
        }
    }
}

/// Extension trait for `axum::`[`Router`] to apply recovery middleware.
pub trait RouterRecoveryExt<S> {
    /// Bounds every request by the configured timeout and turns panics
    /// into `internal_server_error` responses.
    fn with_recovery(self, config: &RecoveryConfig) -> Self;
}

impl<S> RouterRecoveryExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_recovery(self, config: &RecoveryConfig) -> Self {
        self.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: tower::BoxError| async move {
                    middleware_failure(err)
                }))
                .layer(CatchPanicLayer::custom(handler_panic))
                .layer(TimeoutLayer::new(config.request_timeout())),
        )
    }
}

fn middleware_failure(err: tower::BoxError) -> Response {
    if err.is::<Elapsed>() {
        tracing::error!(target: TRACING_TARGET_RECOVERY_ERROR, "Request timeout exceeded");
        return ErrorKind::InternalServerError
            .with_message("Request timeout")
            .into_response();
    }

    tracing::error!(
        target: TRACING_TARGET_RECOVERY_ERROR,
        error = %err,
        "Middleware failed"
    );
    ErrorKind::InternalServerError
        .with_context(err.to_string())
        .into_response()
}

fn handler_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let reason = match payload.downcast::<String>() {
        Ok(reason) => *reason,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "non-string panic payload".to_string(), |r| r.to_string()),
    };

    tracing::error!(
        target: TRACING_TARGET_RECOVERY_PANIC,
        reason = %reason,
        "Handler panicked"
    );

    ErrorKind::InternalServerError.into_response()
}

#[cfg(test)]
mod tests {
    use axum::routing::get;
    use axum_test::TestServer;

    use super::*;

    async fn panics() -> &'static str {
        panic!("handler exploded")
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "done"
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() -> anyhow::Result<()> {
        let app = Router::new()
            .route("/panic", get(panics))
            .with_recovery(&RecoveryConfig::default());
        let server = TestServer::new(app)?;

        let response = server.get("/panic").await;
        response.assert_status_internal_server_error();
        assert_eq!(
            response.json::<serde_json::Value>()["name"],
            "internal_server_error"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_becomes_internal_error() -> anyhow::Result<()> {
        let app = Router::new()
            .route("/slow", get(slow))
            .with_recovery(&RecoveryConfig::with_timeout_secs(1));
        let server = TestServer::new(app)?;

        let response = server.get("/slow").await;
        response.assert_status_internal_server_error();
        assert!(response.text().contains("Request timeout"));
        Ok(())
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        assert!(RecoveryConfig::with_timeout_secs(0).validate().is_err());
        assert!(RecoveryConfig::default().validate().is_ok());
    }
}
