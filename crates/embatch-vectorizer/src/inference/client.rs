//! Reqwest-based client for an Open Inference Protocol model server.

use std::sync::Arc;
use std::time::Instant;

use embatch_core::model::{EmbeddingModel, EmbeddingService, ModelInput};
use embatch_core::{Error, Result, ServiceHealth};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::InferenceConfig;
use super::protocol::{InferRequest, InferResponse};
use crate::TRACING_TARGET_INFERENCE;

/// Inner client that holds the HTTP client and model endpoints.
struct InferenceClientInner {
    http: Client,
    model_name: String,
    infer_url: Url,
    ready_url: Url,
}

/// Embedding model hosted behind an Open Inference Protocol (v2) server.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Clone)]
pub struct InferenceClient {
    inner: Arc<InferenceClientInner>,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("model_name", &self.inner.model_name)
            .field("infer_url", &self.inner.infer_url.as_str())
            .finish_non_exhaustive()
    }
}

impl InferenceClient {
    /// Creates a client for `model_name` on the configured server.
    pub fn new(config: &InferenceConfig, model_name: &str) -> Result<Self> {
        config.validate().map_err(Error::configuration)?;
        let base = config
            .inference_url
            .as_ref()
            .ok_or_else(|| Error::configuration("inference URL is required"))?;

        let infer_url = model_url(base, model_name, "infer")?;
        let ready_url = model_url(base, model_name, "ready")?;

        let http = Client::builder()
            .timeout(config.effective_timeout())
            .build()
            .map_err(|e| {
                Error::configuration("failed to build inference HTTP client").with_source(e)
            })?;

        tracing::info!(
            target: TRACING_TARGET_INFERENCE,
            model = %model_name,
            url = %infer_url,
            "Inference client created"
        );

        let inner = InferenceClientInner {
            http,
            model_name: model_name.to_owned(),
            infer_url,
            ready_url,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Creates a client for the configured text model.
    pub fn text(config: &InferenceConfig) -> Result<Self> {
        Self::new(config, &config.text_model)
    }

    /// Creates a client for the configured vision model.
    pub fn image(config: &InferenceConfig) -> Result<Self> {
        Self::new(config, &config.image_model)
    }

    /// Converts this client into an [`EmbeddingService`].
    pub fn into_service(self) -> EmbeddingService {
        EmbeddingService::new(self)
    }

    fn request_error(&self, error: reqwest::Error) -> Error {
        Error::model_inference(format!(
            "inference request to model '{}' failed",
            self.inner.model_name
        ))
        .with_source(error)
    }
}

/// Builds `{base}/v2/models/{model}/{action}`.
fn model_url(base: &Url, model_name: &str, action: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::configuration(format!("inference URL '{base}' cannot be a base")))?
        .pop_if_empty()
        .extend(["v2", "models", model_name, action]);
    Ok(url)
}

#[async_trait::async_trait]
impl EmbeddingModel for InferenceClient {
    fn model_name(&self) -> &str {
        &self.inner.model_name
    }

    async fn embed(&self, input: &ModelInput) -> Result<Vec<Vec<f32>>> {
        let request = InferRequest::new(input);
        let output = request.output_name();

        let response = self
            .inner
            .http
            .post(self.inner.infer_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::model_inference(format!(
                "model '{}' returned status {status}: {}",
                self.inner.model_name,
                body.chars().take(256).collect::<String>()
            )));
        }

        let response: InferResponse = response.json().await.map_err(|e| {
            Error::model_inference(format!(
                "model '{}' returned an invalid response",
                self.inner.model_name
            ))
            .with_source(e)
        })?;

        response.into_rows(output, input.rows())
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        let started_at = Instant::now();
        let result = self
            .inner
            .http
            .get(self.inner.ready_url.clone())
            .send()
            .await;
        let elapsed = started_at.elapsed();

        let health = match result {
            Ok(response) if response.status().is_success() => ServiceHealth::healthy(),
            Ok(response) => ServiceHealth::unhealthy(format!(
                "model '{}' is not ready: {}",
                self.inner.model_name,
                response.status()
            )),
            Err(error) => ServiceHealth::unhealthy(format!(
                "model '{}' is unreachable: {error}",
                self.inner.model_name
            )),
        };

        Ok(health
            .with_response_time(elapsed)
            .with_metric("model", Value::from(self.inner.model_name.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, serve};
    use embatch_core::model::TokenBatch;
    use embatch_core::{ErrorKind, ServiceStatus};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    async fn spawn(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { serve(listener, router).await });
        Url::parse(&format!("http://{address}/")).unwrap()
    }

    /// Returns `[row, dimension]` for every input row.
    async fn infer(Path(model): Path<String>, Json(body): Json<Value>) -> Json<Value> {
        let rows = body["inputs"][0]["shape"][0].as_u64().unwrap();
        let output = if model == "clip-text" {
            "text_embeds"
        } else {
            "image_embeds"
        };
        let data: Vec<f32> = (0..rows).flat_map(|row| [row as f32, 2.0]).collect();
        Json(json!({
            "model_name": model,
            "outputs": [{"name": output, "shape": [rows, 2], "datatype": "FP32", "data": data}]
        }))
    }

    fn text_input(rows: usize) -> ModelInput {
        ModelInput::Text(
            TokenBatch::from_rows(vec![vec![2, 3]; rows], vec![vec![1, 1]; rows]).unwrap(),
        )
    }

    #[test]
    fn test_model_url() {
        let base = Url::parse("http://models:8080/api/").unwrap();
        let url = model_url(&base, "clip-text", "infer").unwrap();
        assert_eq!(url.as_str(), "http://models:8080/api/v2/models/clip-text/infer");
    }

    #[tokio::test]
    async fn test_embed_returns_rows() {
        let router = Router::new().route("/v2/models/{model}/infer", post(infer));
        let config = InferenceConfig::new(spawn(router).await);
        let client = InferenceClient::text(&config).unwrap();

        let rows = client.embed(&text_input(3)).await.unwrap();
        assert_eq!(rows, vec![vec![0.0, 2.0], vec![1.0, 2.0], vec![2.0, 2.0]]);
    }

    #[tokio::test]
    async fn test_embed_rejects_wrong_output() {
        let router = Router::new().route("/v2/models/{model}/infer", post(infer));
        let config = InferenceConfig::new(spawn(router).await).with_models("other", "clip-vision");
        let client = InferenceClient::text(&config).unwrap();

        let error = client.embed(&text_input(1)).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ModelInference);
        assert!(error.to_string().contains("text_embeds"));
    }

    #[tokio::test]
    async fn test_embed_server_error() {
        let router = Router::new().route(
            "/v2/models/{model}/infer",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "out of memory") }),
        );
        let config = InferenceConfig::new(spawn(router).await);
        let client = InferenceClient::text(&config).unwrap();

        let error = client.embed(&text_input(1)).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ModelInference);
        assert!(error.to_string().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let router = Router::new().route("/v2/models/clip-text/ready", get(|| async { "" }));
        let config = InferenceConfig::new(spawn(router).await);

        let text = InferenceClient::text(&config).unwrap();
        assert_eq!(text.health_check().await.unwrap().status, ServiceStatus::Healthy);

        let image = InferenceClient::image(&config).unwrap();
        assert_eq!(image.health_check().await.unwrap().status, ServiceStatus::Unhealthy);
    }
}
