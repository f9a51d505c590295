//! In-process aggregation sink.

use std::sync::{Arc, Mutex};

use embatch_core::sink::{AggregationRequest, AggregationSink};
use embatch_core::{Error, Result, ServiceHealth};
use serde_json::{Value, json};

use super::lock;

/// Aggregation sink that records every delivery and echoes it back.
///
/// The response is `{"company_name": ..., "embeddings": [...]}`.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    deliveries: Arc<Mutex<Vec<(String, AggregationRequest)>>>,
    failure: Option<String>,
}

impl RecordingSink {
    /// Creates a sink that accepts every delivery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Returns the accepted deliveries in order.
    pub fn deliveries(&self) -> Vec<(String, AggregationRequest)> {
        lock(&self.deliveries).clone()
    }
}

#[async_trait::async_trait]
impl AggregationSink for RecordingSink {
    async fn deliver(&self, company_name: &str, request: &AggregationRequest) -> Result<Value> {
        if let Some(message) = &self.failure {
            return Err(Error::sink_delivery(message.clone()));
        }

        lock(&self.deliveries).push((company_name.to_owned(), request.clone()));
        Ok(json!({
            "company_name": company_name,
            "embeddings": serde_json::to_value(&request.embeddings)?,
        }))
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}
