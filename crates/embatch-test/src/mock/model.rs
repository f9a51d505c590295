//! Mock embedding model.

use std::sync::{Arc, Mutex};

use embatch_core::model::{EmbeddingModel, ModelInput};
use embatch_core::{Error, Result, ServiceHealth};

use super::lock;

/// Deterministic embedding model.
///
/// The vector of a row is derived from a hash of that row's content only
/// (padding is ignored for text), so results do not depend on how a batch
/// was chunked.
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    dimension: usize,
    zero: bool,
    failure: Option<String>,
    invocations: Arc<Mutex<Vec<usize>>>,
}

impl Default for MockEmbeddingModel {
    fn default() -> Self {
        Self::new(8)
    }
}

impl MockEmbeddingModel {
    /// Creates a model producing `dimension`-sized vectors.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            zero: false,
            failure: None,
            invocations: Arc::default(),
        }
    }

    /// Makes the model return all-zero vectors.
    #[must_use]
    pub fn with_zero_vectors(mut self) -> Self {
        self.zero = true;
        self
    }

    /// Makes every invocation fail with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Returns the number of rows of every invocation, in call order.
    pub fn invocations(&self) -> Vec<usize> {
        lock(&self.invocations).clone()
    }

    fn vector(&self, seed: u64) -> Vec<f32> {
        if self.zero {
            return vec![0.0; self.dimension];
        }

        (0..self.dimension as u64)
            .map(|index| {
                let bits = splitmix64(seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
                ((bits >> 40) as f32 / (1u64 << 24) as f32) - 0.5
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl EmbeddingModel for MockEmbeddingModel {
    fn model_name(&self) -> &str {
        "mock-embedding-model"
    }

    async fn embed(&self, input: &ModelInput) -> Result<Vec<Vec<f32>>> {
        lock(&self.invocations).push(input.rows());

        if let Some(message) = &self.failure {
            return Err(Error::model_inference(message.clone()));
        }

        let rows = (0..input.rows())
            .map(|index| {
                let seed = match input {
                    ModelInput::Text(batch) => batch.row(index).map_or(0, |(ids, mask)| {
                        fnv1a(
                            ids.iter()
                                .zip(mask)
                                .filter(|(_, mask)| **mask == 1)
                                .map(|(id, _)| *id as u64),
                        )
                    }),
                    ModelInput::Image(batch) => batch.row(index).map_or(0, |pixels| {
                        fnv1a(pixels.iter().map(|value| u64::from(value.to_bits())))
                    }),
                };
                self.vector(seed)
            })
            .collect();

        Ok(rows)
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

fn fnv1a(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0xcbf2_9ce4_8422_2325, |hash, value| {
        (hash ^ value).wrapping_mul(0x0100_0000_01b3)
    })
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
