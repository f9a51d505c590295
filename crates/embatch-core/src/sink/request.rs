//! Outbound payload of the aggregation sink.

use serde::{Deserialize, Serialize};

use crate::{EmbeddingType, EmbeddingVector, Error, Result};

/// A single embedding with its source id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationEntry {
    /// Id of the item the embedding was computed for.
    pub id: String,
    /// Modality tag.
    pub embedding_type: EmbeddingType,
    /// Unit-length embedding.
    pub embedding: EmbeddingVector,
}

/// Body of the POST sent to the aggregation sink.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregationRequest {
    /// Entries in item order, one per submitted item.
    pub embeddings: Vec<AggregationEntry>,
}

impl AggregationRequest {
    /// Pairs item ids with their embeddings.
    ///
    /// Fails if the number of ids and vectors differ.
    pub fn from_parts<I, S>(
        ids: I,
        vectors: Vec<EmbeddingVector>,
        embedding_type: EmbeddingType,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if ids.len() != vectors.len() {
            return Err(Error::model_inference(format!(
                "model returned {} embeddings for {} items",
                vectors.len(),
                ids.len()
            )));
        }

        let embeddings = ids
            .into_iter()
            .zip(vectors)
            .map(|(id, embedding)| AggregationEntry {
                id,
                embedding_type,
                embedding,
            })
            .collect();

        Ok(Self { embeddings })
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_format() {
        let request = AggregationRequest::from_parts(
            ["a"],
            vec![EmbeddingVector::normalized(vec![1.0, 0.0])],
            EmbeddingType::Image,
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "embeddings": [
                    {"id": "a", "embedding_type": "EMBEDDINGS_IMAGE", "embedding": [1.0, 0.0]}
                ]
            })
        );
    }

    #[test]
    fn test_duplicate_ids_are_kept() {
        let request = AggregationRequest::from_parts(
            ["a", "a"],
            vec![
                EmbeddingVector::normalized(vec![1.0]),
                EmbeddingVector::normalized(vec![2.0]),
            ],
            EmbeddingType::Text,
        )
        .unwrap();
        assert_eq!(request.len(), 2);
    }

    #[test]
    fn test_count_mismatch() {
        let result = AggregationRequest::from_parts(
            ["a", "b"],
            vec![EmbeddingVector::normalized(vec![1.0])],
            EmbeddingType::Text,
        );
        assert!(result.is_err());
    }
}
