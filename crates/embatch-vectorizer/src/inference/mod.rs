//! Embedding model served over the Open Inference Protocol.
//!
//! Text models receive `input_ids` and `attention_mask` (`INT64`, `[B, L]`)
//! and return `text_embeds`. Vision models receive `pixel_values` (`FP32`,
//! `[B, 3, S, S]`) and return `image_embeds`. Both outputs are `FP32`
//! `[B, D]`.

mod client;
mod config;
mod protocol;

pub use client::InferenceClient;
pub use config::InferenceConfig;
