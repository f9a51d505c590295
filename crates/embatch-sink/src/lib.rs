#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;

pub use client::AggregationClient;
pub use config::SinkConfig;
pub use error::{Error, Result};

/// Tracing target for aggregation sink client operations.
pub const TRACING_TARGET: &str = "embatch_sink::client";
