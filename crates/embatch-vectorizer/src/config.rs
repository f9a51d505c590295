//! Vectorizer configuration.

use std::path::PathBuf;

#[cfg(feature = "config")]
use clap::Args;
use embatch_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::inference::{InferenceClient, InferenceConfig};
use crate::{ImageTransform, ImageVectorizer, TextVectorizer};

/// Default truncation length of the CLIP text tower.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 77;

/// Default padding token of the CLIP tokenizer.
pub const DEFAULT_PAD_TOKEN: &str = "<|endoftext|>";

/// Configuration of the text and image vectorizers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct VectorizerConfig {
    /// Path to the `tokenizer.json` of the text model
    #[cfg_attr(feature = "config", arg(long = "tokenizer-path", env = "TOKENIZER_PATH"))]
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,

    /// Maximum number of tokens per text
    #[cfg_attr(
        feature = "config",
        arg(long = "max-sequence-length", env = "MAX_SEQUENCE_LENGTH", default_value = "77")
    )]
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    /// Padding token used when the tokenizer defines none
    #[cfg_attr(
        feature = "config",
        arg(long = "pad-token", env = "PAD_TOKEN", default_value = DEFAULT_PAD_TOKEN)
    )]
    #[serde(default = "default_pad_token")]
    pub pad_token: String,

    /// Side of the square image input in pixels
    #[cfg_attr(
        feature = "config",
        arg(long = "image-size", env = "IMAGE_SIZE", default_value = "224")
    )]
    #[serde(default = "default_image_size")]
    pub image_size: u32,

    /// Model server configuration
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub inference: InferenceConfig,
}

fn default_max_sequence_length() -> usize {
    DEFAULT_MAX_SEQUENCE_LENGTH
}

fn default_pad_token() -> String {
    DEFAULT_PAD_TOKEN.to_owned()
}

fn default_image_size() -> u32 {
    ImageTransform::DEFAULT_SIZE
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            tokenizer_path: None,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            pad_token: default_pad_token(),
            image_size: ImageTransform::DEFAULT_SIZE,
            inference: InferenceConfig::default(),
        }
    }
}

impl VectorizerConfig {
    /// Set the tokenizer path.
    #[must_use]
    pub fn with_tokenizer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokenizer_path = Some(path.into());
        self
    }

    /// Set the model server configuration.
    #[must_use]
    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.tokenizer_path.is_none() {
            return Err("tokenizer path is required".to_string());
        }

        if self.max_sequence_length == 0 {
            return Err("max sequence length must be greater than 0".to_string());
        }

        if self.image_size == 0 {
            return Err("image size must be greater than 0".to_string());
        }

        self.inference.validate()
    }

    /// Builds the text vectorizer against the configured text model.
    pub fn build_text(&self) -> Result<TextVectorizer> {
        self.validate().map_err(Error::configuration)?;
        let path = self
            .tokenizer_path
            .as_ref()
            .ok_or_else(|| Error::configuration("tokenizer path is required"))?;

        let model = InferenceClient::text(&self.inference)?.into_service();
        TextVectorizer::from_file(path, model, self.max_sequence_length, &self.pad_token)
    }

    /// Builds the image vectorizer against the configured vision model.
    pub fn build_image(&self) -> Result<ImageVectorizer> {
        self.inference.validate().map_err(Error::configuration)?;
        if self.image_size == 0 {
            return Err(Error::configuration("image size must be greater than 0"));
        }

        let model = InferenceClient::image(&self.inference)?.into_service();
        Ok(ImageVectorizer::new(ImageTransform::clip(self.image_size), model))
    }
}
