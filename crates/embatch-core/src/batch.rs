//! Batches of items submitted for vectorization.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::{EmbeddingType, Error, Result};

/// Input modality of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Modality {
    /// Raw text.
    Text,
    /// Base64-encoded image bytes.
    Image,
}

impl Modality {
    /// Returns the tag the aggregation sink uses for this modality.
    #[must_use]
    pub const fn embedding_type(self) -> EmbeddingType {
        match self {
            Self::Text => EmbeddingType::Text,
            Self::Image => EmbeddingType::Image,
        }
    }
}

/// Payload of a single item, keyed by its modality.
///
/// Serialized as a single `text` or `image` field next to the item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPayload {
    /// Raw text.
    Text(String),
    /// Base64-encoded image bytes.
    Image(String),
}

impl ItemPayload {
    /// Returns the modality of this payload.
    #[must_use]
    pub const fn modality(&self) -> Modality {
        match self {
            Self::Text(_) => Modality::Text,
            Self::Image(_) => Modality::Image,
        }
    }

    /// Returns the raw payload string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(value) | Self::Image(value) => value,
        }
    }
}

/// A single caller-supplied item.
///
/// The id is opaque: it is neither validated nor required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Join key used downstream to re-associate the embedding.
    pub id: String,
    /// Modality-specific payload.
    #[serde(flatten)]
    pub payload: ItemPayload,
}

impl BatchItem {
    /// Creates a text item.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: ItemPayload::Text(text.into()),
        }
    }

    /// Creates an image item from base64-encoded bytes.
    pub fn image(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: ItemPayload::Image(image.into()),
        }
    }

    /// Returns the modality of this item.
    #[must_use]
    pub const fn modality(&self) -> Modality {
        self.payload.modality()
    }
}

/// An ordered batch of items belonging to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Items in submission order.
    pub items: Vec<BatchItem>,
    /// Tenant the embeddings are partitioned under at the sink.
    pub company_name: String,
}

impl Batch {
    /// Creates a new batch.
    pub fn new(company_name: impl Into<String>, items: Vec<BatchItem>) -> Self {
        Self {
            items,
            company_name: company_name.into(),
        }
    }

    /// Returns the single modality shared by every item.
    ///
    /// Fails with a validation error if the batch is empty or mixes
    /// modalities.
    pub fn modality(&self) -> Result<Modality> {
        let Some(first) = self.items.first() else {
            return Err(Error::validation("batch contains no items"));
        };

        let modality = first.modality();
        if let Some(item) = self.items.iter().find(|item| item.modality() != modality) {
            return Err(Error::validation(format!(
                "batch mixes modalities: item '{}' is {} but the batch is {}",
                item.id,
                item.modality(),
                modality
            )));
        }

        Ok(modality)
    }

    /// Returns the item ids in order, including duplicates.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }

    /// Splits the items into ordered chunks of at most `size` items.
    ///
    /// A `size` of zero is treated as one.
    pub fn chunks(&self, size: usize) -> std::slice::Chunks<'_, BatchItem> {
        self.items.chunks(size.max(1))
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the batch has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
