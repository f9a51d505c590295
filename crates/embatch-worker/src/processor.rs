//! The batch vectorization pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use embatch_core::job::JobEnvelope;
use embatch_core::sink::{AggregationRequest, AggregationService};
use embatch_core::{EmbeddingMatrix, Error, Modality, Result};
use serde_json::Value;

use crate::{ChunkEmbedder, TRACING_TARGET_PROCESSOR};

/// Runs a whole batch through chunked inference, normalization and
/// delivery to the aggregation sink.
///
/// Chunks run strictly one after another and the sink is called once per
/// batch, only after every chunk succeeded.
#[derive(Clone)]
pub struct BatchProcessor {
    text: Option<Arc<dyn ChunkEmbedder>>,
    image: Option<Arc<dyn ChunkEmbedder>>,
    sink: AggregationService,
}

impl fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("text", &self.text.is_some())
            .field("image", &self.image.is_some())
            .finish_non_exhaustive()
    }
}

impl BatchProcessor {
    /// Creates a processor delivering to `sink`, with no embedders yet.
    pub fn new(sink: AggregationService) -> Self {
        Self {
            text: None,
            image: None,
            sink,
        }
    }

    /// Registers the embedder for its modality, replacing any previous one.
    #[must_use]
    pub fn with_embedder<E>(mut self, embedder: E) -> Self
    where
        E: ChunkEmbedder + 'static,
    {
        let embedder: Arc<dyn ChunkEmbedder> = Arc::new(embedder);
        match embedder.modality() {
            Modality::Text => self.text = Some(embedder),
            Modality::Image => self.image = Some(embedder),
        }
        self
    }

    fn embedder(&self, modality: Modality) -> Result<&Arc<dyn ChunkEmbedder>> {
        let embedder = match modality {
            Modality::Text => self.text.as_ref(),
            Modality::Image => self.image.as_ref(),
        };
        embedder.ok_or_else(|| {
            Error::configuration(format!("no embedder is configured for {modality} batches"))
        })
    }

    /// Vectorizes a batch and delivers it, returning the sink's response.
    pub async fn process(&self, envelope: &JobEnvelope) -> Result<Value> {
        let started_at = Instant::now();
        let batch = &envelope.batch;

        let modality = batch.modality()?;
        if modality != envelope.modality {
            return Err(Error::validation(format!(
                "job was submitted as {} but holds {modality} items",
                envelope.modality
            )));
        }
        let embedder = self.embedder(modality)?;

        let chunk_count = batch.len().div_ceil(envelope.batch_size.max(1));
        let mut matrix = EmbeddingMatrix::with_capacity(batch.len());
        for (index, chunk) in batch.chunks(envelope.batch_size).enumerate() {
            let rows = embedder.embed_chunk(chunk).await?;
            if rows.len() != chunk.len() {
                return Err(Error::model_inference(format!(
                    "model returned {} embeddings for a chunk of {} items",
                    rows.len(),
                    chunk.len()
                )));
            }
            matrix.append(rows)?;

            tracing::debug!(
                target: TRACING_TARGET_PROCESSOR,
                job_id = %envelope.job_id,
                chunk = index + 1,
                chunks = chunk_count,
                items = chunk.len(),
                "Chunk embedded"
            );
        }

        let dimension = matrix.dimension().unwrap_or_default();
        let request = AggregationRequest::from_parts(
            batch.ids(),
            matrix.into_normalized(),
            modality.embedding_type(),
        )?;
        let response = self.sink.deliver(&batch.company_name, &request).await?;

        tracing::info!(
            target: TRACING_TARGET_PROCESSOR,
            job_id = %envelope.job_id,
            modality = %modality,
            items = request.len(),
            dimension = dimension,
            elapsed_ms = started_at.elapsed().as_millis(),
            "Batch delivered"
        );

        Ok(response)
    }
}
