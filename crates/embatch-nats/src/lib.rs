#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
///
/// Use this target for logging client initialization, configuration, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "embatch_nats::client";

/// Tracing target for NATS connection operations.
pub const TRACING_TARGET_CONNECTION: &str = "embatch_nats::connection";

/// Tracing target for key-value store operations.
pub const TRACING_TARGET_KV: &str = "embatch_nats::kv";

/// Tracing target for job queue operations.
pub const TRACING_TARGET_QUEUE: &str = "embatch_nats::queue";

mod client;
mod error;
pub mod kv;
pub mod queue;

// Re-export async_nats types needed by consumers
pub use async_nats::jetstream;
pub use client::{NatsClient, NatsConfig};
pub use error::{Error, Result};
