//! Embedding model wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::{EmbeddingModel, ModelInput};
use crate::{Error, Result, ServiceHealth, TRACING_TARGET_MODEL};

/// Embedding model wrapper with observability.
///
/// Checks that the model returned one row per input row. The inner model is
/// wrapped in `Arc` for cheap cloning.
#[derive(Clone)]
pub struct EmbeddingService {
    inner: Arc<dyn EmbeddingModel>,
}

impl fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("model", &self.inner.model_name())
            .finish_non_exhaustive()
    }
}

impl EmbeddingService {
    /// Creates a new embedding service wrapper.
    pub fn new<M>(model: M) -> Self
    where
        M: EmbeddingModel + 'static,
    {
        Self {
            inner: Arc::new(model),
        }
    }

    /// Returns the name of the wrapped model.
    pub fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    /// Runs the model on a prepared batch.
    pub async fn embed(&self, input: &ModelInput) -> Result<Vec<Vec<f32>>> {
        let started_at = Instant::now();
        let rows = input.rows();

        tracing::debug!(
            target: TRACING_TARGET_MODEL,
            model = %self.inner.model_name(),
            modality = %input.modality(),
            rows = rows,
            "Running embedding model"
        );

        let result = self.inner.embed(input).await.and_then(|output| {
            if output.len() == rows {
                Ok(output)
            } else {
                Err(Error::model_inference(format!(
                    "model '{}' returned {} rows for {rows} inputs",
                    self.inner.model_name(),
                    output.len()
                )))
            }
        });
        let elapsed = started_at.elapsed();

        match &result {
            Ok(output) => {
                tracing::debug!(
                    target: TRACING_TARGET_MODEL,
                    model = %self.inner.model_name(),
                    rows = rows,
                    dimension = output.first().map_or(0, Vec::len),
                    elapsed_ms = elapsed.as_millis(),
                    "Embedding model finished"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_MODEL,
                    model = %self.inner.model_name(),
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Embedding model failed"
                );
            }
        }

        result
    }

    /// Performs a health check on the model.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        self.inner.health_check().await
    }
}
