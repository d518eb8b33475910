//! In-process stand-in for the generateContent endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use bookrec_core::config::ApiConfig;
use bookrec_core::gemini::GeminiClient;
use bookrec_core::orchestrator::Orchestrator;
use bookrec_core::protocol::BroadcastMessage;
use bookrec_core::selection::Field;
use bookrec_core::state::StateManager;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};

pub const TEST_KEY: &str = "test-key";

/// What the mock answers with.
#[derive(Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Raw(StatusCode, String),
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Json(
            StatusCode::OK,
            json!({
                "candidates": [
                    { "content": { "parts": [ { "text": text } ], "role": "model" },
                      "finishReason": "STOP" }
                ]
            }),
        )
    }
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub model_path: String,
    pub key: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    replies: Arc<Mutex<Vec<Reply>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    hits: Arc<AtomicUsize>,
    gate: Option<Arc<Notify>>,
}

pub struct MockGemini {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    gate: Option<Arc<Notify>>,
}

impl MockGemini {
    /// Serve `replies` in order; the last one repeats.
    pub async fn start(replies: Vec<Reply>) -> Self {
        Self::spawn(replies, None).await
    }

    /// Like `start`, but every request waits for `release()` before answering.
    pub async fn start_gated(replies: Vec<Reply>) -> Self {
        Self::spawn(replies, Some(Arc::new(Notify::new()))).await
    }

    async fn spawn(replies: Vec<Reply>, gate: Option<Arc<Notify>>) -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(replies)),
            seen: Arc::new(Mutex::new(Vec::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            gate: gate.clone(),
        };
        let app = Router::new()
            .route("/v1/models/:model", post(generate))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/v1"),
            hits: state.hits,
            seen: state.seen,
            gate,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            ..ApiConfig::default()
        }
    }
}

async fn generate(
    State(state): State<MockState>,
    Path(model): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.seen.lock().unwrap().push(SeenRequest {
        model_path: model,
        key: query.get("key").cloned(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    if let Some(gate) = &state.gate {
        gate.notified().await;
    }

    let reply = {
        let mut replies = state.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies[0].clone()
        }
    };
    match reply {
        Reply::Json(status, value) => (status, axum::Json(value)).into_response(),
        Reply::Raw(status, text) => (status, text).into_response(),
    }
}

/// Orchestrator wired to `config`, plus a subscriber to its notices.
pub fn orchestrator_for(
    config: &ApiConfig,
) -> (Orchestrator, broadcast::Receiver<BroadcastMessage>) {
    let (tx, rx) = broadcast::channel(64);
    let state = Arc::new(StateManager::new());
    let client = Arc::new(GeminiClient::new(config, TEST_KEY));
    (Orchestrator::new(state, client, tx), rx)
}

pub async fn fill_selection(orch: &Orchestrator, genre: &str, mood: &str, level: &str) {
    let sm = orch.state_manager();
    sm.select(Field::Genre, Some(genre.to_string())).await;
    sm.select(Field::Mood, Some(mood.to_string())).await;
    sm.select(Field::Level, Some(level.to_string())).await;
}

/// Everything currently queued on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<BroadcastMessage>) -> Vec<BroadcastMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// An address nothing listens on.
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v1")
}
