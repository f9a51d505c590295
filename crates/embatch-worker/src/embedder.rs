//! Chunk-level embedding on top of a vectorizer.

use std::sync::Arc;

use embatch_core::{BatchItem, Error, Modality, Result};
use embatch_vectorizer::Vectorizer;

/// Turns one chunk of items into raw embeddings.
#[async_trait::async_trait]
pub trait ChunkEmbedder: Send + Sync {
    /// Returns the modality this embedder accepts.
    fn modality(&self) -> Modality;

    /// Embeds `chunk`, returning one raw vector per item, in order.
    async fn embed_chunk(&self, chunk: &[BatchItem]) -> Result<Vec<Vec<f32>>>;
}

/// Embedder running a [`Vectorizer`].
///
/// Input preparation is CPU-bound and runs on the blocking thread pool so
/// the async runtime stays responsive.
#[derive(Debug)]
pub struct VectorizerEmbedder<V> {
    vectorizer: Arc<V>,
}

impl<V> Clone for VectorizerEmbedder<V> {
    fn clone(&self) -> Self {
        Self {
            vectorizer: self.vectorizer.clone(),
        }
    }
}

impl<V: Vectorizer> VectorizerEmbedder<V> {
    /// Wraps a vectorizer.
    pub fn new(vectorizer: V) -> Self {
        Self {
            vectorizer: Arc::new(vectorizer),
        }
    }
}

#[async_trait::async_trait]
impl<V: Vectorizer> ChunkEmbedder for VectorizerEmbedder<V> {
    fn modality(&self) -> Modality {
        self.vectorizer.modality()
    }

    async fn embed_chunk(&self, chunk: &[BatchItem]) -> Result<Vec<Vec<f32>>> {
        let modality = self.vectorizer.modality();
        if let Some(item) = chunk.iter().find(|item| item.modality() != modality) {
            return Err(Error::validation(format!(
                "item '{}' is {} but this embedder accepts {modality}",
                item.id,
                item.modality()
            )));
        }

        let inputs: Vec<String> = chunk
            .iter()
            .map(|item| item.payload.as_str().to_owned())
            .collect();
        let vectorizer = self.vectorizer.clone();
        let prepared = tokio::task::spawn_blocking(move || {
            let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            vectorizer.prepare(&inputs)
        })
        .await??;

        self.vectorizer.infer(&prepared).await
    }
}

#[cfg(test)]
mod tests {
    use embatch_core::ErrorKind;
    use embatch_core::model::EmbeddingService;
    use embatch_test::{MockEmbeddingModel, png_base64, word_level_tokenizer};
    use embatch_vectorizer::{ImageTransform, ImageVectorizer, TextVectorizer};

    use super::*;

    fn text_embedder(model: MockEmbeddingModel) -> VectorizerEmbedder<TextVectorizer> {
        let vectorizer = TextVectorizer::new(
            word_level_tokenizer().unwrap(),
            EmbeddingService::new(model),
            77,
            "[PAD]",
        )
        .unwrap();
        VectorizerEmbedder::new(vectorizer)
    }

    #[tokio::test]
    async fn test_embeds_text_chunk() {
        let model = MockEmbeddingModel::new(4);
        let embedder = text_embedder(model.clone());
        let chunk = [BatchItem::text("a", "hello"), BatchItem::text("b", "world")];

        let rows = embedder.embed_chunk(&chunk).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.len() == 4));
        assert_eq!(model.invocations(), vec![2]);
    }

    #[tokio::test]
    async fn test_rejects_other_modality() {
        let embedder = text_embedder(MockEmbeddingModel::default());
        let chunk = [BatchItem::image("a", "aGk=")];

        let error = embedder.embed_chunk(&chunk).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_decode_failure_skips_model() {
        let model = MockEmbeddingModel::default();
        let embedder = VectorizerEmbedder::new(ImageVectorizer::new(
            ImageTransform::clip(8),
            EmbeddingService::new(model.clone()),
        ));
        let chunk = [
            BatchItem::image("a", png_base64(4, 4, [1, 2, 3]).unwrap()),
            BatchItem::image("b", "%%%"),
        ];

        let error = embedder.embed_chunk(&chunk).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Decode);
        assert!(model.invocations().is_empty());
    }
}
