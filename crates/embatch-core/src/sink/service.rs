//! Aggregation sink wrapper with observability.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::{AggregationRequest, AggregationSink};
use crate::{Result, ServiceHealth, TRACING_TARGET_SINK};

/// Aggregation sink wrapper with observability.
///
/// The inner sink is wrapped in `Arc` for cheap cloning.
#[derive(Clone)]
pub struct AggregationService {
    inner: Arc<dyn AggregationSink>,
}

impl fmt::Debug for AggregationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationService").finish_non_exhaustive()
    }
}

impl AggregationService {
    /// Creates a new aggregation service wrapper.
    pub fn new<S>(sink: S) -> Self
    where
        S: AggregationSink + 'static,
    {
        Self {
            inner: Arc::new(sink),
        }
    }

    /// Delivers the embeddings of one job.
    pub async fn deliver(
        &self,
        company_name: &str,
        request: &AggregationRequest,
    ) -> Result<serde_json::Value> {
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET_SINK,
            company_name = %company_name,
            entries = request.len(),
            "Delivering embeddings"
        );

        let result = self.inner.deliver(company_name, request).await;
        let elapsed = started_at.elapsed();

        match &result {
            Ok(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_SINK,
                    company_name = %company_name,
                    entries = request.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Embeddings delivered"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SINK,
                    company_name = %company_name,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Embedding delivery failed"
                );
            }
        }

        result
    }

    /// Performs a health check on the sink.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        self.inner.health_check().await
    }
}
