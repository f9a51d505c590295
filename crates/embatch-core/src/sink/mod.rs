//! Aggregation sink contract.
//!
//! The sink is the downstream service that persists the embeddings of a
//! finished job. It receives one [`AggregationRequest`] per job and its JSON
//! response becomes the job result verbatim.

mod request;
mod service;

pub use request::{AggregationEntry, AggregationRequest};
pub use service::AggregationService;

use crate::{Result, ServiceHealth};

/// Delivery of embeddings to the aggregation sink.
#[async_trait::async_trait]
pub trait AggregationSink: Send + Sync {
    /// Delivers the embeddings of one job on behalf of `company_name`.
    ///
    /// Returns the sink's parsed JSON response.
    async fn deliver(
        &self,
        company_name: &str,
        request: &AggregationRequest,
    ) -> Result<serde_json::Value>;

    /// Performs a health check on the sink.
    async fn health_check(&self) -> Result<ServiceHealth>;
}
