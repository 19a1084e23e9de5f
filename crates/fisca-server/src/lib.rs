//! Fisca Web Server
//!
//! Axum-based REST API for the Fisca budget-transparency portal. Exposes
//! the project CRUD surface and the review-session surface of the import
//! reconciliation engine.
//!
//! Authentication is delegated to a fronting proxy; this server expects to
//! sit behind it and applies a restrictive CORS policy plus input limits.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use fisca_core::session::ReviewSession;
use fisca_core::store::Database;
use fisca_core::{ExtractionBackend, ExtractorClient, ExtractorSettings};

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub extractor: Option<ExtractorClient>,
    /// The single active import session; all review actions serialize
    /// through this lock
    pub session: Mutex<Option<ReviewSession>>,
}

/// Create the application router
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let extractor = ExtractorSettings::load().build_client();
    create_router_with_options(db, extractor, static_dir, config)
}

/// Create the application router with an explicit extractor (for testing)
pub fn create_router_with_options(
    db: Database,
    extractor: Option<ExtractorClient>,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> Router {
    match extractor {
        Some(ref client) => {
            info!(
                "Extraction backend configured: {} (model: {})",
                client.host(),
                client.model()
            );
        }
        None => {
            info!("ℹ️  Extraction backend not configured (set EXTRACTOR_HOST to enable imports)");
        }
    }

    let state = Arc::new(AppState {
        db,
        extractor,
        session: Mutex::new(None),
    });

    let api_routes = Router::new()
        // Projects (admin CRUD)
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/:id",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/projects/:id/files", get(handlers::list_project_files))
        .route("/projects/:id/files/:file_id", get(handlers::download_file))
        // Import reconciliation session
        .route(
            "/import/session",
            post(handlers::begin_session).delete(handlers::discard_session),
        )
        .route("/import/upload", post(handlers::upload_documents))
        .route("/import/upload-json", post(handlers::upload_documents_json))
        .route("/import/drafts", get(handlers::list_drafts))
        .route(
            "/import/drafts/:id",
            patch(handlers::edit_draft).delete(handlers::delete_draft),
        )
        .route("/import/drafts/:id/link", post(handlers::link_draft))
        .route("/import/drafts/:id/promote", post(handlers::promote_draft))
        .route("/import/commit", post(handlers::commit_session))
        .route("/import/log", get(handlers::list_import_log))
        // Health
        .route("/health", get(handlers::health));

    let mut app = Router::new().nest("/api", api_routes);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    app.layer(cors)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server until shutdown
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Fisca server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unprocessable(msg: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
