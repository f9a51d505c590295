#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for embedding model operations.
pub const TRACING_TARGET_MODEL: &str = "embatch_core::model";

/// Tracing target for aggregation sink operations.
pub const TRACING_TARGET_SINK: &str = "embatch_core::sink";

/// Tracing target for job broker and job store operations.
pub const TRACING_TARGET_JOB: &str = "embatch_core::job";

/// Tracing target for retry decisions.
pub const TRACING_TARGET_RETRY: &str = "embatch_core::retry";

mod batch;
mod embedding;
mod error;
mod health;
mod retry;

pub mod job;
pub mod model;
pub mod sink;

pub use batch::{Batch, BatchItem, ItemPayload, Modality};
pub use embedding::{EmbeddingMatrix, EmbeddingType, EmbeddingVector, NORM_EPSILON, l2_normalize};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use health::{ServiceHealth, ServiceStatus};
pub use retry::RetryPolicy;
