#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod fixtures;
mod mock;

pub use fixtures::{
    TOKENIZER_VOCABULARY, image_base64, jpeg_base64, png_base64, word_level_tokenizer,
};
pub use mock::{
    InMemoryJobBroker, InMemoryJobStore, MockEmbeddingModel, MockSinkServer, RecordingSink,
    SinkBehavior,
};
