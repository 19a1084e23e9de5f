//! Import reconciliation session handlers
//!
//! All session access serializes through one lock; uploads are extracted one
//! file at a time while the lock is held, matching the engine's cooperative
//! single-queue model.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, SuccessResponse};
use fisca_core::models::{DraftRecord, ProjectPatch, SourceKind};
use fisca_core::session::{IngestOutcome, ReviewSession};
use fisca_core::store::ImportLogEntry;
use fisca_core::{CommitAction, CommitReport, Committer, Error as CoreError};

fn map_core(e: CoreError) -> AppError {
    match e {
        CoreError::NotFound(msg) => AppError::not_found(&msg),
        CoreError::InvalidData(msg) | CoreError::Session(msg) => AppError::bad_request(&msg),
        other => AppError::from(anyhow::Error::from(other)),
    }
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub existing_records: usize,
    pub draft_count: usize,
}

/// POST /api/import/session - Begin a reconciliation session
///
/// Snapshots the persisted records once; every draft in this session is
/// matched against that snapshot.
pub async fn begin_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionInfo>, AppError> {
    let mut guard = state.session.lock().await;

    if let Some(existing) = guard.as_ref() {
        if !existing.raw_drafts().is_empty() {
            return Err(AppError::conflict(
                "An import session with drafts is already active; commit or discard it first",
            ));
        }
    }

    let session = ReviewSession::begin(&state.db).await.map_err(map_core)?;
    let info = SessionInfo {
        existing_records: session.existing().len(),
        draft_count: 0,
    };
    *guard = Some(session);
    info!(existing = info.existing_records, "import session started");
    Ok(Json(info))
}

/// DELETE /api/import/session - Discard the active session
pub async fn discard_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut guard = state.session.lock().await;
    *guard = None;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Which logical collection the files belong to: project or budget
    pub collection: String,
}

/// POST /api/import/upload?collection=... - Upload and extract documents
///
/// Files are extracted sequentially; a failed file is reported in its
/// outcome and the batch continues.
pub async fn upload_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<Vec<IngestOutcome>>, AppError> {
    let kind: SourceKind = query
        .collection
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("Invalid multipart body"))?
    {
        let file_name = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let mime = field.content_type().map(|m| m.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Invalid file data or file too large (max 10MB)"))?;
        files.push((file_name, mime, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(AppError::bad_request("No files provided"));
    }

    ingest(&state, files, kind).await
}

#[derive(Debug, Deserialize)]
pub struct JsonUpload {
    pub file_name: String,
    #[serde(default)]
    pub mime: Option<String>,
    /// Inline text content (CSV rendering or plain text)
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct JsonUploadRequest {
    pub collection: String,
    pub files: Vec<JsonUpload>,
}

/// POST /api/import/upload-json - Upload text documents as JSON
///
/// Scripting-friendly alternative to the multipart endpoint for CSV and
/// plain-text files.
pub async fn upload_documents_json(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonUploadRequest>,
) -> Result<Json<Vec<IngestOutcome>>, AppError> {
    let kind: SourceKind = request
        .collection
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    if request.files.is_empty() {
        return Err(AppError::bad_request("No files provided"));
    }

    let files = request
        .files
        .into_iter()
        .map(|f| (f.file_name, f.mime, f.text.into_bytes()))
        .collect();

    ingest(&state, files, kind).await
}

async fn ingest(
    state: &Arc<AppState>,
    files: Vec<(String, Option<String>, Vec<u8>)>,
    kind: SourceKind,
) -> Result<Json<Vec<IngestOutcome>>, AppError> {
    let extractor = state.extractor.as_ref().ok_or_else(|| {
        AppError::unprocessable("Extraction backend not configured (set EXTRACTOR_HOST)")
    })?;

    let mut guard = state.session.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| AppError::conflict("No active import session"))?;

    let outcomes = session.ingest_batch(files, kind, extractor).await;
    Ok(Json(outcomes))
}

/// GET /api/import/drafts - The finalized review queue
///
/// Recomputed from the raw set on every call; manual overrides are applied
/// on top.
pub async fn list_drafts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DraftRecord>>, AppError> {
    let guard = state.session.lock().await;
    let session = guard
        .as_ref()
        .ok_or_else(|| AppError::conflict("No active import session"))?;
    Ok(Json(session.finalize()))
}

/// PATCH /api/import/drafts/:id - Edit a draft's fields
pub async fn edit_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut guard = state.session.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| AppError::conflict("No active import session"))?;
    session.edit_draft(id, patch).map_err(map_core)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/import/drafts/:id - Remove a draft from the session
pub async fn delete_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut guard = state.session.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| AppError::conflict("No active import session"))?;
    session.delete_draft(id).map_err(map_core)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub project_id: i64,
}

/// POST /api/import/drafts/:id/link - Manually link a draft to a record
pub async fn link_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<LinkRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.db.get_project(request.project_id)?.is_none() {
        return Err(AppError::not_found("Target project not found"));
    }

    let mut guard = state.session.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| AppError::conflict("No active import session"))?;
    session
        .apply_manual_link(id, request.project_id)
        .map_err(map_core)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Serialize)]
pub struct PromoteResponse {
    pub project_id: i64,
}

/// POST /api/import/drafts/:id/promote - Create a record from the draft
///
/// The draft is linked to the newly created record as in a manual link.
pub async fn promote_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PromoteResponse>, AppError> {
    let mut guard = state.session.lock().await;
    let session = guard
        .as_mut()
        .ok_or_else(|| AppError::conflict("No active import session"))?;
    let project_id = session.promote_draft(id, &state.db).await.map_err(map_core)?;
    Ok(Json(PromoteResponse { project_id }))
}

/// POST /api/import/commit - Commit the session
///
/// Walks every surviving draft sequentially; per-draft failures are
/// reported and do not halt the loop. The session ends either way; the
/// report is the explicit signal for the caller to refetch.
pub async fn commit_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommitReport>, AppError> {
    let session = {
        let mut guard = state.session.lock().await;
        guard
            .take()
            .ok_or_else(|| AppError::conflict("No active import session"))?
    };

    let report = Committer::new(&state.db).commit_session(session).await;

    for outcome in &report.outcomes {
        let (action, project_id, error) = match &outcome.action {
            CommitAction::Created { project_id, .. } => ("created", Some(*project_id), None),
            CommitAction::Updated { project_id, .. } => ("updated", Some(*project_id), None),
            CommitAction::Failed { error } => ("failed", None, Some(error.as_str())),
        };
        state
            .db
            .log_commit(&outcome.source_file, action, project_id, error)?;
    }

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    50
}

/// GET /api/import/log - Recent commit audit trail
pub async fn list_import_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<ImportLogEntry>>, AppError> {
    Ok(Json(state.db.list_import_log(query.limit.clamp(1, 500))?))
}
