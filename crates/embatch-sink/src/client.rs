//! Reqwest-based HTTP client for the aggregation sink.

use std::sync::Arc;

use bytes::Bytes;
use embatch_core::sink::{AggregationRequest, AggregationService, AggregationSink};
use embatch_core::{RetryPolicy, ServiceHealth};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use url::Url;

use crate::{Error, Result, SinkConfig, TRACING_TARGET};

/// Query parameter carrying the tenant of a delivery.
pub const COMPANY_NAME_PARAM: &str = "company_name";

/// Inner client that holds the HTTP client and configuration.
struct AggregationClientInner {
    http: Client,
    url: Url,
    retry: RetryPolicy,
    config: SinkConfig,
}

/// Reqwest-based client delivering embeddings to the aggregation service.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Clone)]
pub struct AggregationClient {
    inner: Arc<AggregationClientInner>,
}

impl std::fmt::Debug for AggregationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationClient")
            .field("url", &self.inner.url.as_str())
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl AggregationClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: SinkConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        let url = config
            .aggregation_url
            .clone()
            .ok_or_else(|| Error::Config("aggregation URL is required".to_string()))?;

        let timeout = config.effective_timeout();
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.effective_user_agent())
            .build()?;

        let retry = config.retry_policy();

        tracing::info!(
            target: TRACING_TARGET,
            url = %url,
            timeout_ms = timeout.as_millis(),
            max_retries = retry.max_retries,
            "Aggregation client created"
        );

        let inner = AggregationClientInner {
            http,
            url,
            retry,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &SinkConfig {
        &self.inner.config
    }

    /// Converts this client into an [`AggregationService`].
    pub fn into_service(self) -> AggregationService {
        AggregationService::new(self)
    }

    /// Returns the delivery URL for a tenant.
    fn delivery_url(&self, company_name: &str) -> Url {
        let mut url = self.inner.url.clone();
        url.query_pairs_mut()
            .append_pair(COMPANY_NAME_PARAM, company_name);
        url
    }

    /// Performs a single delivery attempt.
    async fn post(&self, url: Url, body: Bytes) -> Result<Value> {
        let response = self
            .inner
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(Error::InvalidResponse)
    }
}

#[async_trait::async_trait]
impl AggregationSink for AggregationClient {
    async fn deliver(
        &self,
        company_name: &str,
        request: &AggregationRequest,
    ) -> embatch_core::Result<Value> {
        let body = Bytes::from(serde_json::to_vec(request).map_err(Error::Serde)?);
        let url = self.delivery_url(company_name);

        tracing::debug!(
            target: TRACING_TARGET,
            url = %self.inner.url,
            company_name = %company_name,
            entries = request.len(),
            body_bytes = body.len(),
            "Posting embeddings"
        );

        let response = self
            .inner
            .retry
            .retry_if(|| self.post(url.clone(), body.clone()), Error::is_retryable)
            .await?;

        Ok(response)
    }

    async fn health_check(&self) -> embatch_core::Result<ServiceHealth> {
        // The sink exposes no probe endpoint; a built client is considered healthy.
        Ok(ServiceHealth::healthy().with_metric("url", Value::from(self.inner.url.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use embatch_core::{EmbeddingType, EmbeddingVector, ErrorKind};
    use embatch_test::{MockSinkServer, SinkBehavior};
    use serde_json::json;

    use super::*;

    fn request() -> AggregationRequest {
        AggregationRequest::from_parts(
            ["a", "b"],
            vec![
                EmbeddingVector::normalized(vec![1.0, 0.0]),
                EmbeddingVector::normalized(vec![0.0, 1.0]),
            ],
            EmbeddingType::Text,
        )
        .unwrap()
    }

    #[test]
    fn test_client_requires_url() {
        let error = AggregationClient::new(SinkConfig::default()).unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn test_delivery_url_encodes_company_name() {
        let url = Url::parse("http://sink:8000/embeddings?version=2").unwrap();
        let client = AggregationClient::new(SinkConfig::new(url)).unwrap();
        let url = client.delivery_url("Acme & Söhne");
        assert_eq!(
            url.as_str(),
            "http://sink:8000/embeddings?version=2&company_name=Acme+%26+S%C3%B6hne"
        );
    }

    #[tokio::test]
    async fn test_deliver_returns_sink_response() {
        let sink = MockSinkServer::echo().await.unwrap();
        let client = AggregationClient::new(SinkConfig::new(sink.url())).unwrap();

        let response = client.deliver("acme", &request()).await.unwrap();

        assert_eq!(response["company_name"], "acme");
        assert_eq!(response["received"], serde_json::to_value(request()).unwrap());
        assert_eq!(
            response["received"]["embeddings"][1],
            json!({"id": "b", "embedding_type": "EMBEDDINGS_TEXT", "embedding": [0.0, 1.0]})
        );
        assert_eq!(sink.hits(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_terminal_by_default() {
        let sink = MockSinkServer::spawn(SinkBehavior::Status(503)).await.unwrap();
        let client = AggregationClient::new(SinkConfig::new(sink.url())).unwrap();

        let error = client.deliver("acme", &request()).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::SinkDelivery);
        assert!(error.to_string().contains("503"));
        assert_eq!(sink.hits(), 1);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried() {
        let sink = MockSinkServer::spawn(SinkBehavior::FailFirst(2, 503))
            .await
            .unwrap();
        let config = SinkConfig::new(sink.url()).with_retries(3, 1, 5);
        let client = AggregationClient::new(config).unwrap();

        let response = client.deliver("acme", &request()).await.unwrap();

        assert_eq!(response["company_name"], "acme");
        assert_eq!(sink.hits(), 3);
        assert_eq!(sink.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let sink = MockSinkServer::spawn(SinkBehavior::Status(422)).await.unwrap();
        let config = SinkConfig::new(sink.url()).with_retries(3, 1, 5);
        let client = AggregationClient::new(config).unwrap();

        assert!(client.deliver("acme", &request()).await.is_err());
        assert_eq!(sink.hits(), 1);
    }

    #[tokio::test]
    async fn test_non_json_response_fails() {
        let sink = MockSinkServer::spawn(SinkBehavior::NotJson).await.unwrap();
        let client = AggregationClient::new(SinkConfig::new(sink.url())).unwrap();

        let error = client.deliver("acme", &request()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::SinkDelivery);
        assert!(error.to_string().contains("non-JSON"));
    }

    #[tokio::test]
    async fn test_unreachable_sink_fails() {
        let url = Url::parse("http://127.0.0.1:9/embeddings").unwrap();
        let client = AggregationClient::new(SinkConfig::new(url).with_timeout(2)).unwrap();

        let error = client.deliver("acme", &request()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::SinkDelivery);
    }
}
