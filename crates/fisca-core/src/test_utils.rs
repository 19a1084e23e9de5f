//! Test utilities for fisca-core
//!
//! This module provides testing infrastructure including a mock extraction
//! HTTP server that can be used for development and integration tests.

use axum::{
    extract::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Mock extraction server for testing and development
///
/// Speaks just enough of the chat completions API for the
/// OpenAI-compatible backend: `GET /v1/models` for health checks and
/// `POST /v1/chat/completions` for extraction calls. Responses are derived
/// from the prompt text, so tests stay deterministic.
pub struct MockExtractionServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockExtractionServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat));

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
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockExtractionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Models endpoint (health check)
async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "gpt-4o-mini", "object": "model"}]
    }))
}

/// Chat completions endpoint
///
/// Detects the request type from the prompt text. These markers match the
/// prompt files in prompts/*.md.
async fn handle_chat(Json(request): Json<Value>) -> Json<Value> {
    let prompt = collect_text(&request);

    let content = if prompt.contains("budget approval sheet") {
        // Budget-sheet extraction: array form, wrapped in a fence like
        // real models love to do
        r#"```json
[
  {"project_name": "Tree Planting Day", "organization": "Env Club",
   "budget_requested": 5000, "budget_approved": 4500},
  {"project_name": "Robotics Club Annual Trip", "organization": "Robotics Club",
   "budget_requested": 10000, "budget_approved": 9000}
]
```"#
            .to_string()
    } else {
        // Proposal extraction: single object form
        r#"{"project_name": "Tree Planting Day", "organization": "Env Club",
 "budget_requested": 5300, "rationale": "A greener campus for everyone.",
 "objectives": ["plant 200 trees", "involve 3 classes"]}"#
            .to_string()
    };

    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

/// Concatenate every text content part of every message
fn collect_text(request: &Value) -> String {
    let mut out = String::new();
    if let Some(messages) = request.get("messages").and_then(|m| m.as_array()) {
        for message in messages {
            match message.get("content") {
                Some(Value::String(s)) => out.push_str(s),
                Some(Value::Array(parts)) => {
                    for part in parts {
                        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                            out.push_str(text);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    out
}
