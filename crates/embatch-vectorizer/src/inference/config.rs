//! Inference server configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default timeout for one inference request: 60 seconds.
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 60;

/// Default name of the text model.
pub const DEFAULT_TEXT_MODEL: &str = "clip-text";

/// Default name of the vision model.
pub const DEFAULT_IMAGE_MODEL: &str = "clip-vision";

/// Configuration of the model server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct InferenceConfig {
    /// Base URL of the model server
    #[cfg_attr(feature = "config", arg(long = "inference-url", env = "INFERENCE_URL"))]
    #[serde(default)]
    pub inference_url: Option<Url>,

    /// Name of the text embedding model on the server
    #[cfg_attr(
        feature = "config",
        arg(long = "text-model", env = "TEXT_MODEL", default_value = DEFAULT_TEXT_MODEL)
    )]
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Name of the image embedding model on the server
    #[cfg_attr(
        feature = "config",
        arg(long = "image-model", env = "IMAGE_MODEL", default_value = DEFAULT_IMAGE_MODEL)
    )]
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Timeout of one inference request in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "inference-timeout", env = "INFERENCE_TIMEOUT", default_value = "60")
    )]
    #[serde(default = "default_inference_timeout")]
    pub inference_timeout: u64,
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_owned()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_owned()
}

fn default_inference_timeout() -> u64 {
    DEFAULT_INFERENCE_TIMEOUT_SECS
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            inference_url: None,
            text_model: default_text_model(),
            image_model: default_image_model(),
            inference_timeout: DEFAULT_INFERENCE_TIMEOUT_SECS,
        }
    }
}

impl InferenceConfig {
    /// Creates a configuration for the server at `url`.
    pub fn new(url: Url) -> Self {
        Self {
            inference_url: Some(url),
            ..Self::default()
        }
    }

    /// Returns the request timeout, using the default if zero.
    pub fn effective_timeout(&self) -> Duration {
        match self.inference_timeout {
            0 => Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Set the model names.
    #[must_use]
    pub fn with_models(mut self, text_model: impl Into<String>, image_model: impl Into<String>) -> Self {
        self.text_model = text_model.into();
        self.image_model = image_model.into();
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.inference_timeout = timeout_secs;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        let Some(url) = &self.inference_url else {
            return Err("inference URL is required".to_string());
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "inference URL must use http or https, got '{}'",
                url.scheme()
            ));
        }

        if self.text_model.trim().is_empty() || self.image_model.trim().is_empty() {
            return Err("model names cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.text_model, "clip-text");
        assert_eq!(config.image_model, "clip-vision");
        assert_eq!(config.effective_timeout(), Duration::from_secs(60));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate() {
        let url = Url::parse("http://models:8080").unwrap();
        assert!(InferenceConfig::new(url.clone()).validate().is_ok());
        assert!(
            InferenceConfig::new(url)
                .with_models("", "clip-vision")
                .validate()
                .is_err()
        );
    }
}
