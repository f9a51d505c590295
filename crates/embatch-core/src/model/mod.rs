//! Embedding model capability.
//!
//! The model is opaque: given a prepared batch it returns one raw,
//! unnormalized vector per row, in row order.

mod input;
mod service;

pub use input::{ModelInput, PixelBatch, TokenBatch};
pub use service::EmbeddingService;

use crate::{Result, ServiceHealth};

/// A pretrained embedding model.
///
/// Implementations must be stateless between calls and run in inference
/// mode only.
#[async_trait::async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Returns the model name used in logs and health reports.
    fn model_name(&self) -> &str;

    /// Runs the model on a prepared batch.
    ///
    /// Returns exactly one row per input row, in input order.
    async fn embed(&self, input: &ModelInput) -> Result<Vec<Vec<f32>>>;

    /// Performs a health check on the model.
    async fn health_check(&self) -> Result<ServiceHealth>;
}
