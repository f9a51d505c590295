//! Image vectorizer: base64 decoding and CLIP-style preprocessing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use embatch_core::model::{EmbeddingService, ModelInput, PixelBatch};
use embatch_core::{Error, Modality, Result};
use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Limits};

use crate::{TRACING_TARGET_IMAGE, Vectorizer};

/// Resize, crop and normalization parameters of the vision model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTransform {
    /// Side of the square model input in pixels.
    pub size: u32,
    /// Per-channel mean subtracted after scaling to `[0, 1]`.
    pub mean: [f32; 3],
    /// Per-channel standard deviation divided by after centering.
    pub std: [f32; 3],
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::clip(Self::DEFAULT_SIZE)
    }
}

impl ImageTransform {
    /// Input side of the CLIP ViT-B/32 vision tower.
    pub const DEFAULT_SIZE: u32 = 224;
    /// Channel means used by CLIP preprocessing.
    pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
    /// Channel standard deviations used by CLIP preprocessing.
    pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];
    /// Number of color channels produced.
    pub const CHANNELS: usize = 3;
    /// Largest width or height accepted when decoding.
    pub const MAX_SIDE: u32 = 16_384;

    /// CLIP preprocessing with a square input of `size` pixels.
    pub fn clip(size: u32) -> Self {
        Self {
            size,
            mean: Self::CLIP_MEAN,
            std: Self::CLIP_STD,
        }
    }

    /// Decoder limits applied to untrusted image bytes.
    pub fn limits() -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(Self::MAX_SIDE);
        limits.max_image_height = Some(Self::MAX_SIDE);
        limits
    }

    /// Center crops the largest square, resizes it to `size` and returns
    /// normalized `[channels, size, size]` values.
    ///
    /// Cropping happens in source coordinates, so the work is bounded by
    /// the shortest side no matter how elongated the image is.
    pub fn apply(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 || self.size == 0 {
            return Err(Error::decode("image has no pixels"));
        }

        let side = width.min(height);
        let square = image
            .crop_imm((width - side) / 2, (height - side) / 2, side, side)
            .to_rgb8();
        let cropped = imageops::resize(&square, self.size, self.size, FilterType::CatmullRom);

        let plane = (self.size * self.size) as usize;
        let mut values = vec![0.0; Self::CHANNELS * plane];
        for (x, y, pixel) in cropped.enumerate_pixels() {
            let offset = (y * self.size + x) as usize;
            for channel in 0..Self::CHANNELS {
                let scaled = f32::from(pixel[channel]) / 255.0;
                values[channel * plane + offset] = (scaled - self.mean[channel]) / self.std[channel];
            }
        }

        Ok(values)
    }
}

/// Image vectorizer.
///
/// Decodes every image of a chunk independently and stacks them into one
/// tensor. Any undecodable image fails the whole chunk.
#[derive(Debug, Clone)]
pub struct ImageVectorizer {
    transform: ImageTransform,
    model: EmbeddingService,
}

impl ImageVectorizer {
    /// Creates an image vectorizer.
    pub fn new(transform: ImageTransform, model: EmbeddingService) -> Self {
        Self { transform, model }
    }

    /// Returns the preprocessing parameters.
    pub fn transform(&self) -> &ImageTransform {
        &self.transform
    }

    /// Decodes one base64-encoded image into normalized pixel values.
    fn decode(&self, position: usize, encoded: &str) -> Result<Vec<f32>> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            Error::decode(format!("image at position {position} is not valid base64: {e}"))
        })?;

        let undecodable = |e: image::ImageError| {
            Error::decode(format!("image at position {position} could not be decoded: {e}"))
        };
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| undecodable(e.into()))?;
        reader.limits(ImageTransform::limits());
        let image = reader.decode().map_err(undecodable)?;

        self.transform.apply(&image).map_err(|e| {
            Error::decode(format!("image at position {position} could not be transformed: {e}"))
        })
    }
}

#[async_trait::async_trait]
impl Vectorizer for ImageVectorizer {
    fn modality(&self) -> Modality {
        Modality::Image
    }

    fn prepare(&self, inputs: &[&str]) -> Result<ModelInput> {
        let images = inputs
            .iter()
            .enumerate()
            .map(|(position, encoded)| self.decode(position, encoded))
            .collect::<Result<Vec<_>>>()?;

        let size = self.transform.size as usize;
        let batch = PixelBatch::stack(images, ImageTransform::CHANNELS, size, size)?;

        tracing::trace!(
            target: TRACING_TARGET_IMAGE,
            rows = batch.rows(),
            size = size,
            "Image chunk preprocessed"
        );

        Ok(ModelInput::Image(batch))
    }

    async fn infer(&self, prepared: &ModelInput) -> Result<Vec<Vec<f32>>> {
        self.model.embed(prepared).await
    }
}

#[cfg(test)]
mod tests {
    use embatch_core::ErrorKind;
    use embatch_test::{MockEmbeddingModel, jpeg_base64, png_base64};

    use super::*;

    fn vectorizer(size: u32) -> ImageVectorizer {
        ImageVectorizer::new(
            ImageTransform::clip(size),
            EmbeddingService::new(MockEmbeddingModel::default()),
        )
    }

    fn pixel_batch(input: ModelInput) -> PixelBatch {
        match input {
            ModelInput::Image(batch) => batch,
            ModelInput::Text(_) => panic!("expected a pixel batch"),
        }
    }

    #[test]
    fn test_stacks_images_of_different_sizes() {
        let wide = png_base64(40, 20, [10, 20, 30]).unwrap();
        let tall = jpeg_base64(16, 48, [200, 100, 50]).unwrap();

        let batch = pixel_batch(vectorizer(8).prepare(&[&wide, &tall]).unwrap());
        assert_eq!(batch.shape(), [2, 3, 8, 8]);
    }

    #[test]
    fn test_elongated_image_is_cropped_before_resizing() {
        let strip = png_base64(1, 4000, [90, 120, 150]).unwrap();
        let batch = pixel_batch(vectorizer(224).prepare(&[&strip]).unwrap());
        assert_eq!(batch.shape(), [1, 3, 224, 224]);

        let values = batch.row(0).unwrap();
        let expected_blue =
            (150.0 / 255.0 - ImageTransform::CLIP_MEAN[2]) / ImageTransform::CLIP_STD[2];
        assert!((values[2 * 224 * 224] - expected_blue).abs() < 1e-2);
    }

    #[test]
    fn test_oversized_dimensions_are_refused() {
        let huge = png_base64(ImageTransform::MAX_SIDE + 1, 1, [0, 0, 0]).unwrap();
        let error = vectorizer(4).prepare(&[&huge]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_normalizes_channels() {
        let red = png_base64(10, 10, [255, 0, 0]).unwrap();
        let batch = pixel_batch(vectorizer(4).prepare(&[&red]).unwrap());
        let values = batch.row(0).unwrap();

        let expected_red = (1.0 - ImageTransform::CLIP_MEAN[0]) / ImageTransform::CLIP_STD[0];
        let expected_green = (0.0 - ImageTransform::CLIP_MEAN[1]) / ImageTransform::CLIP_STD[1];
        assert!((values[0] - expected_red).abs() < 1e-2);
        assert!((values[16] - expected_green).abs() < 1e-2);
    }

    #[test]
    fn test_invalid_base64_fails_chunk() {
        let valid = png_base64(4, 4, [0, 0, 0]).unwrap();
        let error = vectorizer(4).prepare(&[&valid, "not base64!!"]).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Decode);
        assert!(error.to_string().contains("position 1"));
    }

    #[test]
    fn test_non_image_bytes_fail() {
        let error = vectorizer(4).prepare(&["aGVsbG8gd29ybGQ="]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Decode);
        assert!(error.to_string().contains("could not be decoded"));
    }

    #[tokio::test]
    async fn test_infer_returns_one_row_per_image() {
        let vectorizer = vectorizer(4);
        let image = png_base64(4, 4, [1, 2, 3]).unwrap();
        let prepared = vectorizer.prepare(&[&image, &image]).unwrap();
        let rows = vectorizer.infer(&prepared).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], rows[1]);
    }
}
