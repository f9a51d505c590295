//! End-to-end scenarios: submit over HTTP, run the queued job on a worker
//! executor, then poll the status endpoint.

use axum_test::TestServer;
use embatch_core::job::{JobBrokerService, JobStoreService};
use embatch_core::model::EmbeddingService;
use embatch_server::handler::routes;
use embatch_server::service::{ServiceConfig, ServiceState};
use embatch_sink::{AggregationClient, SinkConfig};
use embatch_test::{
    InMemoryJobBroker, InMemoryJobStore, MockEmbeddingModel, MockSinkServer, png_base64,
    word_level_tokenizer,
};
use embatch_vectorizer::{ImageTransform, ImageVectorizer, TextVectorizer};
use embatch_worker::{BatchProcessor, JobExecutor, VectorizerEmbedder};
use serde_json::{Value, json};
use url::Url;

struct Harness {
    server: TestServer,
    broker: InMemoryJobBroker,
    executor: JobExecutor,
}

impl Harness {
    fn new(sink_url: Url) -> anyhow::Result<Self> {
        let broker = InMemoryJobBroker::new();
        let store = InMemoryJobStore::new();

        let state = ServiceState::new(
            ServiceConfig::default().with_batch_size(2),
            JobBrokerService::new(broker.clone()),
            JobStoreService::new(store.clone()),
        );
        let server = TestServer::new(routes(&state).with_state(state))?;

        let model = EmbeddingService::new(MockEmbeddingModel::new(16));
        let text = TextVectorizer::new(
            word_level_tokenizer().map_err(|e| anyhow::anyhow!(e))?,
            model.clone(),
            77,
            "[PAD]",
        )?;
        let image = ImageVectorizer::new(ImageTransform::clip(32), model);
        let sink = AggregationClient::new(SinkConfig::new(sink_url).with_timeout(2))?;

        let processor = BatchProcessor::new(sink.into_service())
            .with_embedder(VectorizerEmbedder::new(text))
            .with_embedder(VectorizerEmbedder::new(image));
        let executor = JobExecutor::new(processor, JobStoreService::new(store));

        Ok(Self {
            server,
            broker,
            executor,
        })
    }

    /// Submits a batch and returns its task id.
    async fn submit(&self, path: &str, body: Value) -> String {
        let response = self.server.post(path).json(&body).await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["status"], "Processing started");
        body["task_id"].as_str().unwrap_or_default().to_owned()
    }

    /// Runs every queued job to completion.
    async fn run_queued(&self) {
        for envelope in self.broker.drain() {
            self.executor.execute(&envelope).await;
        }
    }

    async fn status(&self, task_id: &str) -> Value {
        let response = self.server.get(&format!("/task-status/{task_id}")).await;
        response.assert_status_ok();
        response.json::<Value>()
    }
}

#[tokio::test]
async fn text_batch_succeeds_with_sink_response() -> anyhow::Result<()> {
    let sink = MockSinkServer::echo().await?;
    let harness = Harness::new(sink.url())?;

    let task_id = harness
        .submit(
            "/process-text-batch",
            json!({
                "items": [{"id": "a", "text": "hello"}, {"id": "b", "text": "world"}],
                "company_name": "acme",
            }),
        )
        .await;

    assert_eq!(harness.status(&task_id).await["state"], "PENDING");
    harness.run_queued().await;

    let status = harness.status(&task_id).await;
    assert_eq!(status["state"], "SUCCESS");
    assert_eq!(status["result"]["company_name"], "acme");

    let embeddings = status["result"]["received"]["embeddings"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[0]["id"], "a");
    assert_eq!(embeddings[1]["id"], "b");
    for entry in &embeddings {
        assert_eq!(entry["embedding_type"], "EMBEDDINGS_TEXT");
        let norm = entry["embedding"]
            .as_array()
            .map(|values| values.iter().filter_map(Value::as_f64).map(|v| v * v).sum::<f64>())
            .unwrap_or_default()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    assert_eq!(sink.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn image_batch_succeeds() -> anyhow::Result<()> {
    let sink = MockSinkServer::echo().await?;
    let harness = Harness::new(sink.url())?;

    let task_id = harness
        .submit(
            "/process-image-batch",
            json!({
                "items": [
                    {"id": "red", "image": png_base64(40, 20, [255, 0, 0])?},
                    {"id": "blue", "image": png_base64(20, 40, [0, 0, 255])?},
                    {"id": "red", "image": png_base64(8, 8, [255, 0, 0])?},
                ],
                "company_name": "acme",
            }),
        )
        .await;
    harness.run_queued().await;

    let status = harness.status(&task_id).await;
    assert_eq!(status["state"], "SUCCESS");

    let (company_name, body) = sink.requests().remove(0);
    assert_eq!(company_name.as_deref(), Some("acme"));
    let ids: Vec<&str> = body["embeddings"]
        .as_array()
        .map(|entries| entries.iter().filter_map(|e| e["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids, ["red", "blue", "red"]);
    assert_eq!(body["embeddings"][2]["embedding_type"], "EMBEDDINGS_IMAGE");
    Ok(())
}

#[tokio::test]
async fn invalid_image_fails_without_delivery() -> anyhow::Result<()> {
    let sink = MockSinkServer::echo().await?;
    let harness = Harness::new(sink.url())?;

    let task_id = harness
        .submit(
            "/process-image-batch",
            json!({
                "items": [
                    {"id": "ok", "image": png_base64(8, 8, [0, 255, 0])?},
                    {"id": "broken", "image": "!!! not base64 !!!"},
                ],
                "company_name": "acme",
            }),
        )
        .await;
    harness.run_queued().await;

    let status = harness.status(&task_id).await;
    assert_eq!(status["state"], "FAILURE");
    let message = status["status"].as_str().unwrap_or_default();
    assert!(message.contains("decode"), "unexpected message: {message}");
    assert_eq!(sink.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn unreachable_sink_fails() -> anyhow::Result<()> {
    let harness = Harness::new(Url::parse("http://127.0.0.1:9/embeddings")?)?;

    let task_id = harness
        .submit(
            "/process-text-batch",
            json!({"items": [{"id": "a", "text": "hello"}], "company_name": "acme"}),
        )
        .await;
    harness.run_queued().await;

    let status = harness.status(&task_id).await;
    assert_eq!(status["state"], "FAILURE");
    assert!(
        status["status"]
            .as_str()
            .unwrap_or_default()
            .contains("sink_delivery")
    );
    Ok(())
}

#[tokio::test]
async fn unknown_task_is_pending() -> anyhow::Result<()> {
    let harness = Harness::new(Url::parse("http://127.0.0.1:9/embeddings")?)?;

    let status = harness
        .status("00000000-0000-7000-8000-000000000000")
        .await;
    assert_eq!(status, json!({"state": "PENDING", "status": "Pending..."}));
    Ok(())
}
