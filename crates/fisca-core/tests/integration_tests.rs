//! Integration tests for fisca-core
//!
//! These tests exercise the full upload → reconcile → review → commit
//! workflow against a throwaway database and the mock extractor.

use fisca_core::{
    CommitAction, Committer, DraftStatus, MockExtractor, ProjectPatch, ReviewSession, SourceKind,
};
use fisca_core::store::Database;

fn budget_sheet() -> Vec<(String, Option<String>, Vec<u8>)> {
    vec![(
        "approvals.csv".to_string(),
        Some("text/csv".to_string()),
        b"name,organization,requested,approved\n\
          Tree Planting Day,Env Club,5000,4500\n"
            .to_vec(),
    )]
}

fn proposal(requested: &str) -> Vec<(String, Option<String>, Vec<u8>)> {
    vec![(
        "tree_planting_proposal.txt".to_string(),
        Some("text/plain".to_string()),
        format!(
            "tree planting day\n\
             Organization: Env Club\n\
             Requested: {}\n\
             Rationale: a greener campus\n\
             Objective: plant 200 trees\n",
            requested
        )
        .into_bytes(),
    )]
}

#[tokio::test]
async fn test_full_import_workflow() {
    let db = Database::in_memory().unwrap();
    let extractor = MockExtractor::new();

    let mut session = ReviewSession::begin(&db).await.unwrap();

    // Stage one: budget sheet. Stage two: proposal with a requested amount
    // 300 over the sheet, which must raise the integrity flag.
    session
        .ingest_batch(budget_sheet(), SourceKind::BudgetDocument, &extractor)
        .await;
    session
        .ingest_batch(proposal("5,300"), SourceKind::ProjectDocument, &extractor)
        .await;

    let finalized = session.finalize();
    assert_eq!(finalized.len(), 1, "the pair must merge into one draft");

    let merged = &finalized[0];
    assert_eq!(merged.status, DraftStatus::Linked);
    assert_eq!(
        merged.source_file,
        "approvals.csv + tree_planting_proposal.txt"
    );
    // approved comes from the budget sheet, narrative from the proposal
    assert_eq!(merged.fields.approved_amount, Some(4500.0));
    assert_eq!(merged.fields.rationale.as_deref(), Some("a greener campus"));
    assert_eq!(merged.fields.objectives, vec!["plant 200 trees".to_string()]);

    let flag = merged.integrity_flag.expect("300 over the threshold");
    assert_eq!(flag.requested_by_budget_doc, 5000.0);
    assert_eq!(flag.requested_by_project_doc, 5300.0);

    // Commit: one record created, the proposal file attached.
    let report = Committer::new(&db).commit_session(session).await;
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.files_attached, 1);

    let projects = db.list_projects_sync().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].approved_amount, Some(4500.0));
    assert_eq!(projects[0].file_count, 1);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let extractor = MockExtractor::new();

    // First import creates the record.
    let mut session = ReviewSession::begin(&db).await.unwrap();
    session
        .ingest_batch(budget_sheet(), SourceKind::BudgetDocument, &extractor)
        .await;
    let report = Committer::new(&db).commit_session(session).await;
    assert_eq!(report.created, 1);

    // Re-running the same import matches the persisted record and updates
    // it instead of creating a duplicate.
    let mut session = ReviewSession::begin(&db).await.unwrap();
    session
        .ingest_batch(budget_sheet(), SourceKind::BudgetDocument, &extractor)
        .await;

    let finalized = session.finalize();
    assert_eq!(finalized[0].status, DraftStatus::Update);

    let report = Committer::new(&db).commit_session(session).await;
    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(db.list_projects_sync().unwrap().len(), 1);
}

#[tokio::test]
async fn test_boundary_difference_does_not_flag() {
    let db = Database::in_memory().unwrap();
    let extractor = MockExtractor::new();

    let mut session = ReviewSession::begin(&db).await.unwrap();
    session
        .ingest_batch(budget_sheet(), SourceKind::BudgetDocument, &extractor)
        .await;
    // 5100 vs 5000: exactly on the threshold, treated as rounding
    session
        .ingest_batch(proposal("5,100"), SourceKind::ProjectDocument, &extractor)
        .await;

    let finalized = session.finalize();
    assert_eq!(finalized[0].status, DraftStatus::Linked);
    assert!(finalized[0].integrity_flag.is_none());
}

#[tokio::test]
async fn test_review_edits_survive_into_commit() {
    let db = Database::in_memory().unwrap();
    let extractor = MockExtractor::new();

    let mut session = ReviewSession::begin(&db).await.unwrap();
    session
        .ingest_batch(budget_sheet(), SourceKind::BudgetDocument, &extractor)
        .await;

    let draft_id = session.finalize()[0].id;
    session
        .edit_draft(
            draft_id,
            ProjectPatch {
                approved_amount: Some(4200.0),
                responsible: Some("Pat Doe".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let report = Committer::new(&db).commit_session(session).await;
    assert_eq!(report.created, 1);

    let project = &db.list_projects_sync().unwrap()[0];
    assert_eq!(project.approved_amount, Some(4200.0));
    assert_eq!(project.responsible.as_deref(), Some("Pat Doe"));
}

#[tokio::test]
async fn test_promote_then_commit_updates_the_new_record() {
    let db = Database::in_memory().unwrap();
    let extractor = MockExtractor::new();

    let mut session = ReviewSession::begin(&db).await.unwrap();
    session
        .ingest_batch(budget_sheet(), SourceKind::BudgetDocument, &extractor)
        .await;

    let draft_id = session.finalize()[0].id;
    let project_id = session.promote_draft(draft_id, &db).await.unwrap();

    // the draft is now linked to the freshly created record
    let finalized = session.finalize();
    assert_eq!(finalized[0].linked_project_id, Some(project_id));
    assert_eq!(finalized[0].status, DraftStatus::Update);

    let report = Committer::new(&db).commit_session(session).await;
    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(db.list_projects_sync().unwrap().len(), 1);

    match report.outcomes[0].action {
        CommitAction::Updated { project_id: id, .. } => assert_eq!(id, project_id),
        _ => panic!("expected an update to the promoted record"),
    }
}

#[tokio::test]
async fn test_commit_log_records_outcomes() {
    let db = Database::in_memory().unwrap();
    let extractor = MockExtractor::new();

    let mut session = ReviewSession::begin(&db).await.unwrap();
    session
        .ingest_batch(budget_sheet(), SourceKind::BudgetDocument, &extractor)
        .await;

    let report = Committer::new(&db).commit_session(session).await;
    for outcome in &report.outcomes {
        let (action, project_id, error) = match &outcome.action {
            CommitAction::Created { project_id, .. } => ("created", Some(*project_id), None),
            CommitAction::Updated { project_id, .. } => ("updated", Some(*project_id), None),
            CommitAction::Failed { error } => ("failed", None, Some(error.as_str())),
        };
        db.log_commit(&outcome.source_file, action, project_id, error)
            .unwrap();
    }

    let log = db.list_import_log(10).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "created");
    assert_eq!(log[0].source_file, "approvals.csv");
}
