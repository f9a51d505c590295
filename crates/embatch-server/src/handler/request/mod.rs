//! Request bodies.

mod jobs;

pub use jobs::ProcessBatch;
