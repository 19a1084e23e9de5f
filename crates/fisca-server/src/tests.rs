//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use fisca_core::store::Database;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    create_router_with_options(
        db,
        Some(ExtractorClient::mock()),
        None,
        ServerConfig::default(),
    )
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ========== Project CRUD ==========

#[tokio::test]
async fn test_create_and_get_project() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "name": "Tree Planting Day",
        "organization": "Env Club",
        "requested_amount": 5000.0
    });
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/projects", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = get_body_json(response).await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .oneshot(get(&format!("/api/projects/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let project = get_body_json(response).await;
    assert_eq!(project["name"], "Tree Planting Day");
    assert_eq!(project["file_count"], 0);
}

#[tokio::test]
async fn test_create_project_requires_name() {
    let app = setup_test_app();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/projects",
            serde_json::json!({"name": "  "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_project_is_partial() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/projects",
            serde_json::json!({"name": "Tree Planting Day", "requested_amount": 5000.0}),
        ))
        .await
        .unwrap();
    let id = get_body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/projects/{}", id),
            serde_json::json!({"approved_amount": 4500.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = get_body_json(response).await;
    assert_eq!(updated["approved_amount"], 4500.0);
    assert_eq!(updated["requested_amount"], 5000.0);
}

#[tokio::test]
async fn test_get_missing_project_is_404() {
    let app = setup_test_app();
    let response = app.oneshot(get("/api/projects/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Import session ==========

async fn begin_session(app: &Router) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/import/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn upload_sheet(app: &Router, csv: &str) -> serde_json::Value {
    let body = serde_json::json!({
        "collection": "budget",
        "files": [{"file_name": "approvals.csv", "mime": "text/csv", "text": csv}]
    });
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/import/upload-json", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await
}

#[tokio::test]
async fn test_upload_without_session_conflicts() {
    let app = setup_test_app();
    let body = serde_json::json!({
        "collection": "budget",
        "files": [{"file_name": "approvals.csv", "text": "Tree Planting Day,5000,4500\n"}]
    });
    let response = app
        .oneshot(json_request(Method::POST, "/api/import/upload-json", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_import_flow_end_to_end() {
    let app = setup_test_app();

    begin_session(&app).await;

    let outcomes = upload_sheet(&app, "Tree Planting Day,Env Club,5000,4500\n").await;
    assert_eq!(outcomes[0]["drafts_added"], 1);
    assert!(outcomes[0]["error"].is_null());

    // proposal for the same project merges on the review queue
    let body = serde_json::json!({
        "collection": "project",
        "files": [{
            "file_name": "proposal.txt",
            "text": "tree planting day\nRequested: 5300\nRationale: greener campus\n"
        }]
    });
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/import/upload-json", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/import/drafts")).await.unwrap();
    let drafts = get_body_json(response).await;
    let drafts = drafts.as_array().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0]["status"], "linked");
    assert_eq!(drafts[0]["fields"]["approved_amount"], 4500.0);
    assert!(drafts[0]["integrity_flag"].is_object());

    let draft_id = drafts[0]["id"].as_i64().unwrap();

    // the operator accepts the proposal's figure
    let response = app
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/import/drafts/{}", draft_id),
            serde_json::json!({"requested_amount": 5300.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/import/commit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = get_body_json(response).await;
    assert_eq!(report["created"], 1);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["files_attached"], 1);

    // the session ended; the queue is gone
    let response = app.clone().oneshot(get("/api/import/drafts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // the record landed, with the operator's edit
    let response = app.clone().oneshot(get("/api/projects")).await.unwrap();
    let projects = get_body_json(response).await;
    assert_eq!(projects.as_array().unwrap().len(), 1);
    assert_eq!(projects[0]["requested_amount"], 5300.0);

    // and the audit trail has the row
    let response = app.oneshot(get("/api/import/log")).await.unwrap();
    let log = get_body_json(response).await;
    assert_eq!(log[0]["action"], "created");
}

#[tokio::test]
async fn test_manual_link_targets_specific_record() {
    let app = setup_test_app();

    // one persisted record with no files, as the picker would show
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/projects",
            serde_json::json!({"name": "Community Garden"}),
        ))
        .await
        .unwrap();
    let project_id = get_body_json(response).await["id"].as_i64().unwrap();

    begin_session(&app).await;
    upload_sheet(&app, "Garden Expansion Works,1000,900\n").await;

    let response = app.clone().oneshot(get("/api/import/drafts")).await.unwrap();
    let drafts = get_body_json(response).await;
    let draft_id = drafts[0]["id"].as_i64().unwrap();
    assert_eq!(drafts[0]["status"], "new");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/import/drafts/{}/link", draft_id),
            serde_json::json!({"project_id": project_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/import/drafts")).await.unwrap();
    let drafts = get_body_json(response).await;
    assert_eq!(drafts[0]["status"], "update");
    assert_eq!(drafts[0]["linked_project_id"], project_id);
    assert_eq!(drafts[0]["note"], "linked manually");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/import/commit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let report = get_body_json(response).await;
    assert_eq!(report["updated"], 1);

    // no duplicate was created
    let response = app.oneshot(get("/api/projects")).await.unwrap();
    let projects = get_body_json(response).await;
    assert_eq!(projects.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_files_filter() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/projects",
            serde_json::json!({"name": "Community Garden"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/projects?missing_files=true"))
        .await
        .unwrap();
    let projects = get_body_json(response).await;
    assert_eq!(projects.as_array().unwrap().len(), 1);
}
