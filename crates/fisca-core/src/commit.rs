//! Commit: write finalized drafts to the persisted store
//!
//! Sequential and deliberately non-transactional: a failure partway leaves
//! earlier records written, the per-item report shows which, and re-running
//! the import is safe because re-matching finds the already-written records
//! as update candidates.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{error, info};

use crate::error::Result;
use crate::models::{DraftRecord, DraftStatus, ProjectPatch, SourceKind, SourceUpload};
use crate::session::ReviewSession;
use crate::store::ProjectStore;

/// What happened to one draft
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommitAction {
    Created {
        project_id: i64,
        file_id: Option<i64>,
    },
    Updated {
        project_id: i64,
        file_id: Option<i64>,
    },
    Failed {
        error: String,
    },
}

/// Per-draft commit outcome
#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub draft_id: i64,
    pub project_name: String,
    pub source_file: String,
    pub action: CommitAction,
}

/// The explicit session-ended result returned to the caller.
///
/// The caller decides whether to refetch persisted records; nothing here
/// triggers an implicit refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitReport {
    pub outcomes: Vec<CommitOutcome>,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub files_attached: usize,
}

impl CommitReport {
    fn record(&mut self, outcome: CommitOutcome) {
        match &outcome.action {
            CommitAction::Created { file_id, .. } => {
                self.created += 1;
                if file_id.is_some() {
                    self.files_attached += 1;
                }
            }
            CommitAction::Updated { file_id, .. } => {
                self.updated += 1;
                if file_id.is_some() {
                    self.files_attached += 1;
                }
            }
            CommitAction::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Walks the finalized draft set and performs the idempotent
/// create-or-update per draft.
pub struct Committer<'a, S: ProjectStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ProjectStore + ?Sized> Committer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Commit a whole session: finalize, write every surviving draft, and
    /// consume the session. Returns the per-draft report.
    pub async fn commit_session(&self, session: ReviewSession) -> CommitReport {
        let finalized = session.finalize();
        self.commit_drafts(&finalized, session.uploads()).await
    }

    /// Commit an already-finalized draft list.
    ///
    /// One draft at a time, in list order; a failed item is reported and the
    /// loop continues.
    pub async fn commit_drafts(
        &self,
        drafts: &[DraftRecord],
        uploads: &HashMap<i64, SourceUpload>,
    ) -> CommitReport {
        let mut report = CommitReport::default();

        for draft in drafts {
            if draft.status == DraftStatus::Superseded {
                continue;
            }

            let action = match self.commit_one(draft, uploads).await {
                Ok(action) => action,
                Err(e) => {
                    error!(
                        draft = %draft.fields.name,
                        source = %draft.source_file,
                        error = %e,
                        "commit failed for draft"
                    );
                    CommitAction::Failed {
                        error: e.to_string(),
                    }
                }
            };

            report.record(CommitOutcome {
                draft_id: draft.id,
                project_name: draft.fields.name.clone(),
                source_file: draft.source_file.clone(),
                action,
            });
        }

        info!(
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            files = report.files_attached,
            "commit finished"
        );
        report
    }

    async fn commit_one(
        &self,
        draft: &DraftRecord,
        uploads: &HashMap<i64, SourceUpload>,
    ) -> Result<CommitAction> {
        let (project_id, created) = match draft.linked_project_id {
            None => {
                let id = self.store.create_project(&draft.fields).await?;
                info!(project_id = id, name = %draft.fields.name, "project created");
                (id, true)
            }
            Some(id) => {
                let patch = patch_for(draft);
                self.store.update_project(id, &patch).await?;
                info!(project_id = id, name = %draft.fields.name, "project updated");
                (id, false)
            }
        };

        let file_id = match draft.upload_id.and_then(|id| uploads.get(&id)) {
            Some(upload) => Some(
                self.store
                    .upload_file(project_id, &upload.file_name, &upload.bytes)
                    .await?,
            ),
            None => None,
        };

        Ok(if created {
            CommitAction::Created {
                project_id,
                file_id,
            }
        } else {
            CommitAction::Updated {
                project_id,
                file_id,
            }
        })
    }
}

/// Decide which fields an update writes, from the draft's merge state.
///
/// A merged draft carries trustworthy values from both sources: the
/// authoritative approved amount plus the narrative fields. A standalone
/// budget draft writes only monetary fields. A standalone proposal draft
/// writes narrative and requested-amount fields; it never clobbers the
/// approved amount. The persisted display name is canonical and is not
/// rewritten by updates.
fn patch_for(draft: &DraftRecord) -> ProjectPatch {
    let f = &draft.fields;
    let mut patch = ProjectPatch::default();

    let merged = draft.status == DraftStatus::Linked;
    let monetary = merged || draft.source_kind == SourceKind::BudgetDocument;
    let narrative = merged || draft.source_kind == SourceKind::ProjectDocument;

    if monetary {
        patch.approved_amount = f.approved_amount;
        if !f.budget_lines.is_empty() {
            patch.budget_lines = Some(f.budget_lines.clone());
        }
    }
    if narrative {
        patch.organization = f.organization.clone();
        patch.responsible = f.responsible.clone();
        patch.rationale = f.rationale.clone();
        if !f.objectives.is_empty() {
            patch.objectives = Some(f.objectives.clone());
        }
        if !merged && !f.budget_lines.is_empty() {
            patch.budget_lines = Some(f.budget_lines.clone());
        }
    }
    // both kinds state a requested amount
    patch.requested_amount = f.requested_amount;

    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::ProjectFields;
    use crate::store::Database;
    use async_trait::async_trait;

    fn draft(
        id: i64,
        name: &str,
        kind: SourceKind,
        status: DraftStatus,
        linked: Option<i64>,
    ) -> DraftRecord {
        let mut d = DraftRecord::new(
            id,
            "source.csv",
            kind,
            ProjectFields {
                name: name.to_string(),
                organization: Some("Env Club".to_string()),
                requested_amount: Some(5000.0),
                approved_amount: Some(4500.0),
                rationale: Some("greener campus".to_string()),
                ..Default::default()
            },
        );
        d.status = status;
        d.linked_project_id = linked;
        d
    }

    #[tokio::test]
    async fn test_commit_creates_new_project() {
        let db = Database::in_memory().unwrap();
        let committer = Committer::new(&db);

        let drafts = vec![draft(
            1,
            "Tree Planting Day",
            SourceKind::BudgetDocument,
            DraftStatus::New,
            None,
        )];
        let report = committer.commit_drafts(&drafts, &HashMap::new()).await;

        assert_eq!(report.created, 1);
        assert_eq!(report.failed, 0);
        let all = db.list_projects_sync().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Tree Planting Day");
    }

    #[tokio::test]
    async fn test_commit_update_twice_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let project_id = db
            .create_project_sync(&ProjectFields {
                name: "Tree Planting Day".to_string(),
                ..Default::default()
            })
            .unwrap();

        let committer = Committer::new(&db);
        let drafts = vec![draft(
            1,
            "Tree Planting Day",
            SourceKind::BudgetDocument,
            DraftStatus::Update,
            Some(project_id),
        )];

        let first = committer.commit_drafts(&drafts, &HashMap::new()).await;
        let second = committer.commit_drafts(&drafts, &HashMap::new()).await;

        assert_eq!(first.updated, 1);
        assert_eq!(second.updated, 1);
        // two updates to the same id, never a duplicate record
        assert_eq!(db.list_projects_sync().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_standalone_proposal_never_clobbers_approved() {
        let db = Database::in_memory().unwrap();
        let project_id = db
            .create_project_sync(&ProjectFields {
                name: "Tree Planting Day".to_string(),
                approved_amount: Some(4500.0),
                ..Default::default()
            })
            .unwrap();

        let mut d = draft(
            1,
            "Tree Planting Day",
            SourceKind::ProjectDocument,
            DraftStatus::Update,
            Some(project_id),
        );
        d.fields.approved_amount = Some(9_999.0);
        d.fields.requested_amount = Some(5_100.0);

        let committer = Committer::new(&db);
        committer.commit_drafts(&[d], &HashMap::new()).await;

        let project = db.get_project(project_id).unwrap().unwrap();
        assert_eq!(project.approved_amount, Some(4500.0));
        assert_eq!(project.requested_amount, Some(5100.0));
        assert_eq!(project.rationale.as_deref(), Some("greener campus"));
    }

    #[tokio::test]
    async fn test_standalone_budget_writes_only_monetary_fields() {
        let db = Database::in_memory().unwrap();
        let project_id = db
            .create_project_sync(&ProjectFields {
                name: "Tree Planting Day".to_string(),
                rationale: Some("original rationale".to_string()),
                ..Default::default()
            })
            .unwrap();

        let d = draft(
            1,
            "Tree Planting Day",
            SourceKind::BudgetDocument,
            DraftStatus::Update,
            Some(project_id),
        );

        let committer = Committer::new(&db);
        committer.commit_drafts(&[d], &HashMap::new()).await;

        let project = db.get_project(project_id).unwrap().unwrap();
        assert_eq!(project.approved_amount, Some(4500.0));
        // narrative untouched by a budget-only update
        assert_eq!(project.rationale.as_deref(), Some("original rationale"));
        assert_eq!(project.organization, None);
    }

    #[tokio::test]
    async fn test_merged_draft_writes_both() {
        let db = Database::in_memory().unwrap();
        let project_id = db
            .create_project_sync(&ProjectFields {
                name: "Tree Planting Day".to_string(),
                ..Default::default()
            })
            .unwrap();

        let d = draft(
            1,
            "Tree Planting Day",
            SourceKind::ProjectDocument,
            DraftStatus::Linked,
            Some(project_id),
        );

        let committer = Committer::new(&db);
        committer.commit_drafts(&[d], &HashMap::new()).await;

        let project = db.get_project(project_id).unwrap().unwrap();
        assert_eq!(project.approved_amount, Some(4500.0));
        assert_eq!(project.rationale.as_deref(), Some("greener campus"));
    }

    #[tokio::test]
    async fn test_superseded_drafts_are_not_committed() {
        let db = Database::in_memory().unwrap();
        let drafts = vec![draft(
            1,
            "Absorbed Proposal",
            SourceKind::ProjectDocument,
            DraftStatus::Superseded,
            None,
        )];
        let report = Committer::new(&db).commit_drafts(&drafts, &HashMap::new()).await;
        assert!(report.outcomes.is_empty());
        assert!(db.list_projects_sync().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attaches_proposal_file_once() {
        let db = Database::in_memory().unwrap();
        let mut d = draft(
            1,
            "Tree Planting Day",
            SourceKind::ProjectDocument,
            DraftStatus::New,
            None,
        );
        d.upload_id = Some(7);

        let mut uploads = HashMap::new();
        uploads.insert(
            7,
            SourceUpload {
                id: 7,
                file_name: "proposal.pdf".to_string(),
                mime: Some("application/pdf".to_string()),
                bytes: b"%PDF-1.4".to_vec(),
            },
        );

        let committer = Committer::new(&db);
        let report = committer.commit_drafts(&[d.clone()], &uploads).await;
        assert_eq!(report.files_attached, 1);

        let project_id = match report.outcomes[0].action {
            CommitAction::Created { project_id, .. } => project_id,
            _ => panic!("expected create"),
        };

        // re-running against the now-existing record must not duplicate
        // the attachment
        d.status = DraftStatus::Update;
        d.linked_project_id = Some(project_id);
        committer.commit_drafts(&[d], &uploads).await;
        assert_eq!(db.list_files(project_id).unwrap().len(), 1);
    }

    /// Store wrapper that rejects creates for one project name
    struct FlakyStore {
        inner: Database,
        reject_name: String,
    }

    #[async_trait]
    impl ProjectStore for FlakyStore {
        async fn list_projects(&self) -> crate::error::Result<Vec<crate::models::Project>> {
            self.inner.list_projects().await
        }

        async fn create_project(&self, fields: &ProjectFields) -> crate::error::Result<i64> {
            if fields.name == self.reject_name {
                return Err(Error::InvalidData("store rejected the record".into()));
            }
            self.inner.create_project(fields).await
        }

        async fn update_project(
            &self,
            id: i64,
            patch: &ProjectPatch,
        ) -> crate::error::Result<()> {
            self.inner.update_project(id, patch).await
        }

        async fn upload_file(
            &self,
            project_id: i64,
            file_name: &str,
            bytes: &[u8],
        ) -> crate::error::Result<i64> {
            self.inner.upload_file(project_id, file_name, bytes).await
        }
    }

    #[tokio::test]
    async fn test_failure_partway_does_not_halt_the_loop() {
        let store = FlakyStore {
            inner: Database::in_memory().unwrap(),
            reject_name: "Cursed Project".to_string(),
        };

        let drafts = vec![
            draft(1, "First Project", SourceKind::BudgetDocument, DraftStatus::New, None),
            draft(2, "Cursed Project", SourceKind::BudgetDocument, DraftStatus::New, None),
            draft(3, "Third Project", SourceKind::BudgetDocument, DraftStatus::New, None),
        ];

        let report = Committer::new(&store).commit_drafts(&drafts, &HashMap::new()).await;
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes.len(), 3);
        assert!(matches!(report.outcomes[1].action, CommitAction::Failed { .. }));
        // both survivors were written despite the failure in between
        assert_eq!(store.inner.list_projects_sync().unwrap().len(), 2);
    }
}
