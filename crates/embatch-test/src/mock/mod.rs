//! Mock implementations of the pipeline's external collaborators.
//!
//! These mocks keep everything they receive so tests can assert on it.

mod jobs;
mod model;
mod server;
mod sink;

pub use jobs::{InMemoryJobBroker, InMemoryJobStore};
pub use model::MockEmbeddingModel;
pub use server::{MockSinkServer, SinkBehavior};
pub use sink::RecordingSink;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, ignoring poisoning from a panicked test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
