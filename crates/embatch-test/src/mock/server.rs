//! Local HTTP aggregation sink.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use super::lock;

/// Path the mock sink accepts deliveries on.
const SINK_PATH: &str = "/embeddings";

/// How the mock sink answers deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkBehavior {
    /// Echo `{"company_name", "received"}` with status 200.
    Echo,
    /// Always answer with the given status and an error body.
    Status(u16),
    /// Answer with the status for the first `n` requests, then echo.
    FailFirst(usize, u16),
    /// Answer 200 with a body that is not JSON.
    NotJson,
}

#[derive(Debug)]
struct SinkState {
    behavior: SinkBehavior,
    requests: Mutex<Vec<(Option<String>, Value)>>,
    hits: AtomicUsize,
}

/// An aggregation sink served over HTTP on a random local port.
///
/// The server task is aborted on drop.
#[derive(Debug)]
pub struct MockSinkServer {
    url: Url,
    state: Arc<SinkState>,
    task: JoinHandle<()>,
}

impl MockSinkServer {
    /// Starts a sink with the given behavior.
    pub async fn spawn(behavior: SinkBehavior) -> std::io::Result<Self> {
        let state = Arc::new(SinkState {
            behavior,
            requests: Mutex::default(),
            hits: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route(SINK_PATH, post(deliver))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let url = Url::parse(&format!("http://{addr}{SINK_PATH}")).map_err(std::io::Error::other)?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self { url, state, task })
    }

    /// Starts an echoing sink.
    pub async fn echo() -> std::io::Result<Self> {
        Self::spawn(SinkBehavior::Echo).await
    }

    /// Returns the delivery URL.
    pub fn url(&self) -> Url {
        self.url.clone()
    }

    /// Returns the requests received so far as `(company_name, body)`.
    pub fn requests(&self) -> Vec<(Option<String>, Value)> {
        lock(&self.state.requests).clone()
    }

    /// Returns the number of requests received, including failed ones.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockSinkServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn deliver(
    State(state): State<Arc<SinkState>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst);
    let company_name = query.get("company_name").cloned();

    let failure = match state.behavior {
        SinkBehavior::Echo | SinkBehavior::NotJson => None,
        SinkBehavior::Status(status) => Some(status),
        SinkBehavior::FailFirst(n, status) => (hit < n).then_some(status),
    };

    if let Some(status) = failure {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({"error": "sink failure"}))).into_response();
    }

    lock(&state.requests).push((company_name.clone(), body.clone()));

    if state.behavior == SinkBehavior::NotJson {
        return (StatusCode::OK, "stored").into_response();
    }

    Json(json!({"company_name": company_name, "received": body})).into_response()
}
