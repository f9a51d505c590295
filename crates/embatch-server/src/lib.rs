#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for job submission and status handlers.
pub const TRACING_TARGET_JOBS: &str = "embatch_server::handler::jobs";

/// Tracing target for health handlers.
pub const TRACING_TARGET_HEALTH: &str = "embatch_server::handler::health";

/// Tracing target for request metrics.
pub const TRACING_TARGET_METRICS: &str = "embatch_server::metrics";

/// Tracing target for error recovery including middleware errors and request failures.
pub const TRACING_TARGET_RECOVERY_ERROR: &str = "embatch_server::recovery::error";

/// Tracing target for panic recovery.
pub const TRACING_TARGET_RECOVERY_PANIC: &str = "embatch_server::recovery::panic";

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod service;
