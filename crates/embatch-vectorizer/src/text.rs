//! Text vectorizer backed by a Hugging Face tokenizer.

use std::fmt;
use std::path::Path;

use embatch_core::model::{EmbeddingService, ModelInput, TokenBatch};
use embatch_core::{Error, Modality, Result};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::{TRACING_TARGET_TEXT, Vectorizer};

/// Text vectorizer.
///
/// Tokenizes a chunk jointly: every row is padded to the longest text in the
/// chunk and truncated at `max_length` tokens.
pub struct TextVectorizer {
    tokenizer: Tokenizer,
    model: EmbeddingService,
    max_length: usize,
}

impl fmt::Debug for TextVectorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextVectorizer")
            .field("model", &self.model)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl TextVectorizer {
    /// Creates a text vectorizer from a loaded tokenizer.
    ///
    /// Padding is forced to batch-longest. If the tokenizer has no padding
    /// configured, `pad_token` is looked up in its vocabulary (falling back
    /// to id 0).
    pub fn new(
        mut tokenizer: Tokenizer,
        model: EmbeddingService,
        max_length: usize,
        pad_token: &str,
    ) -> Result<Self> {
        let padding = match tokenizer.get_padding() {
            Some(padding) => PaddingParams {
                strategy: PaddingStrategy::BatchLongest,
                ..padding.clone()
            },
            None => PaddingParams {
                strategy: PaddingStrategy::BatchLongest,
                pad_id: tokenizer.token_to_id(pad_token).unwrap_or(0),
                pad_token: pad_token.to_owned(),
                ..PaddingParams::default()
            },
        };
        tokenizer.with_padding(Some(padding));

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..TruncationParams::default()
            }))
            .map_err(|e| Error::configuration(format!("invalid truncation settings: {e}")))?;

        Ok(Self {
            tokenizer,
            model,
            max_length,
        })
    }

    /// Loads a `tokenizer.json` file and creates a text vectorizer.
    pub fn from_file(
        path: impl AsRef<Path>,
        model: EmbeddingService,
        max_length: usize,
        pad_token: &str,
    ) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            Error::configuration(format!(
                "failed to load tokenizer from {}: {e}",
                path.display()
            ))
        })?;

        tracing::info!(
            target: TRACING_TARGET_TEXT,
            path = %path.display(),
            vocab_size = tokenizer.get_vocab_size(true),
            "Tokenizer loaded"
        );

        Self::new(tokenizer, model, max_length, pad_token)
    }

    /// Returns the truncation length in tokens.
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

#[async_trait::async_trait]
impl Vectorizer for TextVectorizer {
    fn modality(&self) -> Modality {
        Modality::Text
    }

    fn prepare(&self, inputs: &[&str]) -> Result<ModelInput> {
        let encodings = self
            .tokenizer
            .encode_batch(inputs.to_vec(), true)
            .map_err(|e| Error::decode(format!("failed to tokenize text: {e}")))?;

        let ids = encodings.iter().map(|e| e.get_ids().to_vec()).collect();
        let masks = encodings
            .iter()
            .map(|e| e.get_attention_mask().to_vec())
            .collect();
        let batch = TokenBatch::from_rows(ids, masks)?;

        tracing::trace!(
            target: TRACING_TARGET_TEXT,
            rows = batch.rows(),
            sequence_length = batch.sequence_length(),
            "Text chunk tokenized"
        );

        Ok(ModelInput::Text(batch))
    }

    async fn infer(&self, prepared: &ModelInput) -> Result<Vec<Vec<f32>>> {
        self.model.embed(prepared).await
    }
}

#[cfg(test)]
mod tests {
    use embatch_test::{MockEmbeddingModel, word_level_tokenizer};

    use super::*;

    fn vectorizer(max_length: usize) -> TextVectorizer {
        TextVectorizer::new(
            word_level_tokenizer().unwrap(),
            EmbeddingService::new(MockEmbeddingModel::default()),
            max_length,
            "[PAD]",
        )
        .unwrap()
    }

    fn token_batch(input: ModelInput) -> TokenBatch {
        match input {
            ModelInput::Text(batch) => batch,
            ModelInput::Image(_) => panic!("expected a token batch"),
        }
    }

    #[test]
    fn test_pads_to_longest_row() {
        let batch = token_batch(
            vectorizer(77)
                .prepare(&["hello", "the quick brown fox"])
                .unwrap(),
        );

        assert_eq!(batch.rows(), 2);
        assert_eq!(batch.sequence_length(), 4);
        assert_eq!(batch.row(0), Some((&[2, 0, 0, 0][..], &[1, 0, 0, 0][..])));
        assert_eq!(batch.row(1), Some((&[4, 5, 6, 7][..], &[1, 1, 1, 1][..])));
    }

    #[test]
    fn test_truncates_long_rows() {
        let batch = token_batch(
            vectorizer(3)
                .prepare(&["the quick brown fox jumps over the lazy dog"])
                .unwrap(),
        );
        assert_eq!(batch.sequence_length(), 3);
    }

    #[test]
    fn test_unknown_words_are_kept() {
        let batch = token_batch(vectorizer(77).prepare(&["hello zebra"]).unwrap());
        assert_eq!(batch.row(0), Some((&[2, 1][..], &[1, 1][..])));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        word_level_tokenizer().unwrap().save(&path, false).unwrap();

        let vectorizer = TextVectorizer::from_file(
            &path,
            EmbeddingService::new(MockEmbeddingModel::default()),
            77,
            "[PAD]",
        )
        .unwrap();
        assert_eq!(vectorizer.max_length(), 77);

        let missing = TextVectorizer::from_file(
            dir.path().join("missing.json"),
            EmbeddingService::new(MockEmbeddingModel::default()),
            77,
            "[PAD]",
        );
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_infer_returns_one_row_per_input() {
        let vectorizer = vectorizer(77);
        let prepared = vectorizer.prepare(&["hello", "world", "fox"]).unwrap();
        let rows = vectorizer.infer(&prepared).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 8));
    }
}
