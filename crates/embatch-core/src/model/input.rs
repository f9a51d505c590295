//! Tensor representations of prepared batches.

use crate::{Error, Modality, Result};

/// Token ids and attention mask of a padded text batch.
///
/// Both tensors are row-major with shape `[rows, sequence_length]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBatch {
    rows: usize,
    sequence_length: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
}

impl TokenBatch {
    /// Builds a token batch from per-row ids and masks.
    ///
    /// Every row must already be padded to the same length.
    pub fn from_rows(ids: Vec<Vec<u32>>, masks: Vec<Vec<u32>>) -> Result<Self> {
        if ids.len() != masks.len() {
            return Err(Error::decode(format!(
                "tokenizer produced {} id rows and {} mask rows",
                ids.len(),
                masks.len()
            )));
        }

        let sequence_length = ids.first().map_or(0, Vec::len);
        let rows = ids.len();
        let mut input_ids = Vec::with_capacity(rows * sequence_length);
        let mut attention_mask = Vec::with_capacity(rows * sequence_length);

        for (row_ids, row_mask) in ids.into_iter().zip(masks) {
            if row_ids.len() != sequence_length || row_mask.len() != sequence_length {
                return Err(Error::decode("tokenized rows are not padded to a uniform length"));
            }
            input_ids.extend(row_ids.into_iter().map(i64::from));
            attention_mask.extend(row_mask.into_iter().map(i64::from));
        }

        Ok(Self {
            rows,
            sequence_length,
            input_ids,
            attention_mask,
        })
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the padded sequence length.
    #[must_use]
    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Returns the flattened token ids.
    #[must_use]
    pub fn input_ids(&self) -> &[i64] {
        &self.input_ids
    }

    /// Returns the flattened attention mask.
    #[must_use]
    pub fn attention_mask(&self) -> &[i64] {
        &self.attention_mask
    }

    /// Returns the ids and mask of row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<(&[i64], &[i64])> {
        let start = index.checked_mul(self.sequence_length)?;
        let end = start + self.sequence_length;
        Some((
            self.input_ids.get(start..end)?,
            self.attention_mask.get(start..end)?,
        ))
    }
}

/// Normalized pixel values of a stacked image batch.
///
/// Row-major with shape `[rows, channels, height, width]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBatch {
    rows: usize,
    channels: usize,
    height: usize,
    width: usize,
    pixel_values: Vec<f32>,
}

impl PixelBatch {
    /// Stacks per-image `[channels, height, width]` tensors.
    pub fn stack(
        images: Vec<Vec<f32>>,
        channels: usize,
        height: usize,
        width: usize,
    ) -> Result<Self> {
        let image_len = channels * height * width;
        let rows = images.len();
        let mut pixel_values = Vec::with_capacity(rows * image_len);

        for image in images {
            if image.len() != image_len {
                return Err(Error::decode(format!(
                    "image tensor has {} values, expected {image_len}",
                    image.len()
                )));
            }
            pixel_values.extend(image);
        }

        Ok(Self {
            rows,
            channels,
            height,
            width,
            pixel_values,
        })
    }

    /// Returns the number of images.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the tensor shape.
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        [self.rows, self.channels, self.height, self.width]
    }

    /// Returns the flattened pixel values.
    #[must_use]
    pub fn pixel_values(&self) -> &[f32] {
        &self.pixel_values
    }

    /// Returns the pixel values of image `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let len = self.channels * self.height * self.width;
        let start = index.checked_mul(len)?;
        self.pixel_values.get(start..start + len)
    }
}

/// A prepared batch ready for the embedding model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    /// Tokenized text.
    Text(TokenBatch),
    /// Preprocessed images.
    Image(PixelBatch),
}

impl ModelInput {
    /// Returns the modality of the batch.
    #[must_use]
    pub const fn modality(&self) -> Modality {
        match self {
            Self::Text(_) => Modality::Text,
            Self::Image(_) => Modality::Image,
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        match self {
            Self::Text(batch) => batch.rows(),
            Self::Image(batch) => batch.rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_batch_flattens_rows() {
        let batch =
            TokenBatch::from_rows(vec![vec![1, 2, 0], vec![3, 4, 5]], vec![vec![1, 1, 0], vec![1, 1, 1]])
                .unwrap();
        assert_eq!(batch.rows(), 2);
        assert_eq!(batch.sequence_length(), 3);
        assert_eq!(batch.input_ids(), &[1, 2, 0, 3, 4, 5]);
        assert_eq!(batch.row(1), Some((&[3, 4, 5][..], &[1, 1, 1][..])));
        assert_eq!(batch.row(2), None);
    }

    #[test]
    fn test_token_batch_rejects_ragged_rows() {
        let result = TokenBatch::from_rows(vec![vec![1, 2], vec![3]], vec![vec![1, 1], vec![1]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pixel_batch_stack() {
        let batch = PixelBatch::stack(vec![vec![0.0; 12], vec![1.0; 12]], 3, 2, 2).unwrap();
        assert_eq!(batch.shape(), [2, 3, 2, 2]);
        assert_eq!(batch.row(1), Some(&[1.0; 12][..]));
        assert!(PixelBatch::stack(vec![vec![0.0; 11]], 3, 2, 2).is_err());
    }
}
