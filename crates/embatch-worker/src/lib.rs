#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the worker loops.
pub const TRACING_TARGET_WORKER: &str = "embatch_worker::worker";

/// Tracing target for batch processing.
pub const TRACING_TARGET_PROCESSOR: &str = "embatch_worker::processor";

mod config;
mod embedder;
mod error;
mod executor;
mod processor;
mod worker;

pub use config::{DEFAULT_CONSUMER_NAME, DEFAULT_WORKER_CONCURRENCY, WorkerConfig};
pub use embedder::{ChunkEmbedder, VectorizerEmbedder};
pub use error::{Result, WorkerError};
pub use executor::JobExecutor;
pub use processor::BatchProcessor;
pub use worker::{JobSource, Worker, WorkerHandles};
