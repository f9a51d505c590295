//! Request extractors with improved error messages.
//!
//! [`Json`] and [`Path`] are drop-in replacements for their axum counterparts
//! whose rejections are rendered as [`ErrorResponse`] bodies.
//!
//! [`ErrorResponse`]: crate::handler::ErrorResponse

pub mod reject;

pub use crate::extract::reject::{Json, Path};
