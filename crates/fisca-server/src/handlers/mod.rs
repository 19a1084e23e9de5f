//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod import;
pub mod projects;

// Re-export all handlers for use in router
pub use import::*;
pub use projects::*;

use axum::Json;

/// GET /api/health - Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
