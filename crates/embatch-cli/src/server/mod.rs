//! HTTP server startup and graceful shutdown.

/// Tracing target for server startup events.
pub const TRACING_TARGET_STARTUP: &str = "embatch_cli::server::startup";

/// Tracing target for server shutdown events.
pub const TRACING_TARGET_SHUTDOWN: &str = "embatch_cli::server::shutdown";

mod error;
mod http_server;
mod shutdown;

use error::Result;
pub use error::ServerError;
pub use http_server::serve_http;
pub use shutdown::shutdown_signal;
