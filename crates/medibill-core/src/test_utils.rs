//! Test utilities for medibill-core
//!
//! This module provides testing infrastructure including a mock Gemini server
//! that can be used for development and integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::SAMPLE_RESPONSE;

/// What the mock server answers to `generateContent`
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A candidate whose text is this string
    Text(String),
    /// An error status with this body
    Status(u16, String),
    /// A 200 with no candidates (e.g. blocked prompt)
    NoCandidates,
}

/// A request received by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// `{model}:generateContent` path segment
    pub target: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Debug)]
struct MockState {
    reply: Mutex<MockReply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Mock Gemini server for testing and development
pub struct MockGeminiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    state: Arc<MockState>,
}

impl MockGeminiServer {
    /// Start the mock server on an available port, answering with the sample analysis
    pub async fn start() -> Self {
        Self::start_with(MockReply::Text(SAMPLE_RESPONSE.to_string())).await
    }

    /// Start the mock server with a specific reply
    pub async fn start_with(reply: MockReply) -> Self {
        let state = Arc::new(MockState {
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(
                "/v1beta/models/:target",
                get(handle_model_info).post(handle_generate),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            state,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Change the reply for subsequent requests
    pub fn set_reply(&self, reply: MockReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Model metadata endpoint (health check)
async fn handle_model_info(Path(target): Path<String>, headers: HeaderMap) -> Response {
    if headers.get("x-goog-api-key").is_none() {
        return (StatusCode::FORBIDDEN, "missing key").into_response();
    }
    Json(json!({
        "name": format!("models/{}", target),
        "displayName": "Mock Gemini",
    }))
    .into_response()
}

/// `generateContent` endpoint
async fn handle_generate(
    State(state): State<Arc<MockState>>,
    Path(target): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.requests.lock().unwrap().push(RecordedRequest {
        target,
        api_key,
        body,
    });

    let reply = state.reply.lock().unwrap().clone();
    match reply {
        MockReply::Text(text) => Json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        }))
        .into_response(),
        MockReply::Status(code, message) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({"error": {"code": code, "message": message}})),
        )
            .into_response(),
        MockReply::NoCandidates => Json(json!({
            "promptFeedback": {"blockReason": "OTHER"}
        }))
        .into_response(),
    }
}
