//! Fixtures for model input preparation.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, ImageResult, Rgb, RgbImage};
use tokenizers::Tokenizer;

/// Words known to [`word_level_tokenizer`], in id order after the
/// `[PAD]` (0) and `[UNK]` (1) tokens.
pub const TOKENIZER_VOCABULARY: &[&str] = &[
    "hello", "world", "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog",
];

/// Builds a whitespace word-level tokenizer over [`TOKENIZER_VOCABULARY`].
///
/// The tokenizer has no padding or truncation configured.
pub fn word_level_tokenizer() -> tokenizers::Result<Tokenizer> {
    let mut vocab = serde_json::Map::new();
    vocab.insert("[PAD]".to_owned(), 0.into());
    vocab.insert("[UNK]".to_owned(), 1.into());
    for (index, word) in TOKENIZER_VOCABULARY.iter().enumerate() {
        vocab.insert((*word).to_owned(), (index + 2).into());
    }

    let definition = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
    });

    Tokenizer::from_bytes(definition.to_string().as_bytes())
}

/// Encodes a solid-color image in `format` and returns it as base64.
pub fn image_base64(format: ImageFormat, width: u32, height: u32, rgb: [u8; 3]) -> ImageResult<String> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format)?;
    Ok(STANDARD.encode(bytes))
}

/// Encodes a solid-color PNG and returns it as base64.
pub fn png_base64(width: u32, height: u32, rgb: [u8; 3]) -> ImageResult<String> {
    image_base64(ImageFormat::Png, width, height, rgb)
}

/// Encodes a solid-color JPEG and returns it as base64.
pub fn jpeg_base64(width: u32, height: u32, rgb: [u8; 3]) -> ImageResult<String> {
    image_base64(ImageFormat::Jpeg, width, height, rgb)
}
