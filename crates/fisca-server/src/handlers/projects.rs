//! Project CRUD handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, SuccessResponse};
use fisca_core::models::{AttachedFile, Project, ProjectFields, ProjectPatch};

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    /// Only projects with no attached files (backs the manual-link picker)
    #[serde(default)]
    pub missing_files: bool,
}

/// GET /api/projects - List all projects
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = if query.missing_files {
        state.db.list_projects_missing_files()?
    } else {
        state.db.list_projects_sync()?
    };
    Ok(Json(projects))
}

/// GET /api/projects/:id - Get one project
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Project>, AppError> {
    let project = state
        .db
        .get_project(id)?
        .ok_or_else(|| AppError::not_found("Project not found"))?;
    Ok(Json(project))
}

/// POST /api/projects - Create a project
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<ProjectFields>,
) -> Result<Json<Project>, AppError> {
    if fields.name.trim().is_empty() {
        return Err(AppError::bad_request("Project name is required"));
    }
    let id = state.db.create_project_sync(&fields)?;
    let project = state
        .db
        .get_project(id)?
        .ok_or_else(|| AppError::not_found("Project not found after create"))?;
    Ok(Json(project))
}

/// PUT /api/projects/:id - Partially update a project
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<Project>, AppError> {
    if state.db.get_project(id)?.is_none() {
        return Err(AppError::not_found("Project not found"));
    }
    state.db.update_project_sync(id, &patch)?;
    let project = state
        .db
        .get_project(id)?
        .ok_or_else(|| AppError::not_found("Project not found"))?;
    Ok(Json(project))
}

/// DELETE /api/projects/:id - Delete a project and its files
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.db.get_project(id)?.is_none() {
        return Err(AppError::not_found("Project not found"));
    }
    state.db.delete_project(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/projects/:id/files - List attached files
pub async fn list_project_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AttachedFile>>, AppError> {
    if state.db.get_project(id)?.is_none() {
        return Err(AppError::not_found("Project not found"));
    }
    Ok(Json(state.db.list_files(id)?))
}

/// GET /api/projects/:id/files/:file_id - Download one attached file
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path((id, file_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let (file, data) = state
        .db
        .get_file(file_id)?
        .filter(|(f, _)| f.project_id == id)
        .ok_or_else(|| AppError::not_found("File not found"))?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.file_name),
        ),
    ];
    Ok((headers, data))
}
