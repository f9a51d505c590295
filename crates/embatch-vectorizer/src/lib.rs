#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for text preparation.
pub const TRACING_TARGET_TEXT: &str = "embatch_vectorizer::text";

/// Tracing target for image preparation.
pub const TRACING_TARGET_IMAGE: &str = "embatch_vectorizer::image";

/// Tracing target for remote inference calls.
pub const TRACING_TARGET_INFERENCE: &str = "embatch_vectorizer::inference";

mod config;
mod text;
mod vision;

pub mod inference;

use embatch_core::model::ModelInput;
use embatch_core::{Modality, Result};

pub use crate::config::VectorizerConfig;
pub use crate::text::TextVectorizer;
pub use crate::vision::{ImageTransform, ImageVectorizer};

/// A modality-specific wrapper around one embedding model.
///
/// `prepare` is CPU-bound and synchronous; callers running on an async
/// runtime should move it to a blocking thread.
#[async_trait::async_trait]
pub trait Vectorizer: Send + Sync + 'static {
    /// Returns the modality this vectorizer accepts.
    fn modality(&self) -> Modality;

    /// Decodes raw inputs into model input, keeping every input.
    ///
    /// Fails with a decode error if any input cannot be decoded.
    fn prepare(&self, inputs: &[&str]) -> Result<ModelInput>;

    /// Runs the model on a prepared batch, one raw vector per input.
    async fn infer(&self, prepared: &ModelInput) -> Result<Vec<Vec<f32>>>;
}
