//! Response bodies.

mod error_response;
mod jobs;

pub use error_response::ErrorResponse;
pub use jobs::TaskAccepted;
