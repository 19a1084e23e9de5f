//! Review session: the working set of drafts between upload and commit
//!
//! The session owns the raw draft set, the persisted-record snapshot, the
//! raw uploaded files, and the manual-override overlay. The finalized view
//! shown to the operator is always derived fresh: `reconcile` over the raw
//! set, then the overlay applied by draft id. Overrides therefore survive
//! any recomputation triggered by adding more files to the session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::extract::{prepare_payload, ExtractionBackend};
use crate::linker::reconcile;
use crate::matcher::match_existing;
use crate::models::{
    DraftRecord, DraftStatus, Project, ProjectPatch, SourceKind, SourceUpload,
};
use crate::store::ProjectStore;

/// Note attached by a manual link or a promote-to-new action.
pub const NOTE_MANUAL: &str = "linked manually";

/// Per-file result of an upload batch
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub file_name: String,
    pub drafts_added: usize,
    /// Items the service returned without a usable project name
    pub items_skipped: usize,
    /// Extraction failure; the file was skipped, the batch continued
    pub error: Option<String>,
}

/// Manual decisions recorded against one finalized draft
#[derive(Debug, Clone, Default)]
struct DraftOverride {
    edit: ProjectPatch,
    manual_link: Option<i64>,
}

impl DraftOverride {
    fn is_empty(&self) -> bool {
        self.edit.is_empty() && self.manual_link.is_none()
    }
}

/// One in-memory reconciliation session
pub struct ReviewSession {
    next_draft_id: i64,
    next_upload_id: i64,
    /// The raw accumulated draft set feeding the linker
    drafts: Vec<DraftRecord>,
    /// Manual overrides keyed by draft id, applied after reconciliation
    overrides: HashMap<i64, DraftOverride>,
    /// Raw uploaded proposal files, keyed by upload id
    uploads: HashMap<i64, SourceUpload>,
    /// Snapshot of persisted records, fetched once at session start
    existing: Vec<Project>,
    pub started_at: DateTime<Utc>,
}

impl ReviewSession {
    /// Create a session over a snapshot of the persisted records
    pub fn new(existing: Vec<Project>) -> Self {
        Self {
            next_draft_id: 1,
            next_upload_id: 1,
            drafts: Vec::new(),
            overrides: HashMap::new(),
            uploads: HashMap::new(),
            existing,
            started_at: Utc::now(),
        }
    }

    /// Begin a session by snapshotting the store
    pub async fn begin<S: ProjectStore + ?Sized>(store: &S) -> Result<Self> {
        let existing = store.list_projects().await?;
        Ok(Self::new(existing))
    }

    /// The persisted-record snapshot this session matches against
    pub fn existing(&self) -> &[Project] {
        &self.existing
    }

    /// The raw draft set (before linking)
    pub fn raw_drafts(&self) -> &[DraftRecord] {
        &self.drafts
    }

    /// Fetch a raw uploaded file by id
    pub fn upload(&self, upload_id: i64) -> Option<&SourceUpload> {
        self.uploads.get(&upload_id)
    }

    /// All raw uploads, keyed by upload id
    pub fn uploads(&self) -> &HashMap<i64, SourceUpload> {
        &self.uploads
    }

    /// Extract one uploaded file and append its drafts to the raw set.
    ///
    /// Each draft is matched against the persisted snapshot as it is
    /// created. Proposal files are retained for commit-time attachment.
    pub async fn ingest_upload<E: ExtractionBackend + ?Sized>(
        &mut self,
        file_name: &str,
        mime: Option<&str>,
        bytes: Vec<u8>,
        kind: SourceKind,
        extractor: &E,
    ) -> Result<(usize, usize)> {
        let upload = SourceUpload {
            id: self.next_upload_id,
            file_name: file_name.to_string(),
            mime: mime.map(|m| m.to_string()),
            bytes,
        };

        let payload = prepare_payload(&upload)?;
        let items = extractor.extract_items(file_name, &payload, kind).await?;

        let mut skipped = 0usize;
        let mut added = 0usize;
        let mut retain_upload = false;

        for item in items {
            if item.is_empty() {
                warn!(file = file_name, "extracted item has no project name, skipping");
                skipped += 1;
                continue;
            }

            let mut draft =
                DraftRecord::new(self.next_draft_id, file_name, kind, item.into_fields());
            self.next_draft_id += 1;

            if kind == SourceKind::ProjectDocument {
                draft.upload_id = Some(upload.id);
                retain_upload = true;
            }

            match_existing(&mut draft, &self.existing);
            debug!(
                draft_id = draft.id,
                name = %draft.fields.name,
                status = %draft.status,
                "draft created"
            );
            self.drafts.push(draft);
            added += 1;
        }

        if retain_upload {
            self.uploads.insert(upload.id, upload);
        }
        self.next_upload_id += 1;

        Ok((added, skipped))
    }

    /// Extract a batch of files, one at a time, each call fully awaited.
    ///
    /// A failed or unsupported file is logged and skipped; the batch
    /// continues. This is the only retry boundary of the pipeline.
    pub async fn ingest_batch<E: ExtractionBackend + ?Sized>(
        &mut self,
        files: Vec<(String, Option<String>, Vec<u8>)>,
        kind: SourceKind,
        extractor: &E,
    ) -> Vec<IngestOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());

        for (file_name, mime, bytes) in files {
            match self
                .ingest_upload(&file_name, mime.as_deref(), bytes, kind, extractor)
                .await
            {
                Ok((added, skipped)) => outcomes.push(IngestOutcome {
                    file_name,
                    drafts_added: added,
                    items_skipped: skipped,
                    error: None,
                }),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "extraction failed, skipping file");
                    outcomes.push(IngestOutcome {
                        file_name,
                        drafts_added: 0,
                        items_skipped: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        outcomes
    }

    /// Derive the finalized view: reconcile, then apply manual overrides.
    pub fn finalize(&self) -> Vec<DraftRecord> {
        let mut finalized = reconcile(&self.drafts);
        for draft in &mut finalized {
            if let Some(ov) = self.overrides.get(&draft.id) {
                apply_override(draft, ov);
            }
        }
        finalized
    }

    /// Replace a subset of a draft's fields. Does not re-run matching.
    pub fn edit_draft(&mut self, draft_id: i64, patch: ProjectPatch) -> Result<()> {
        self.require_finalized(draft_id)?;
        let ov = self.overrides.entry(draft_id).or_default();
        merge_patch(&mut ov.edit, patch);
        Ok(())
    }

    /// Remove a draft from the raw set that feeds the linker.
    ///
    /// Re-running the linker cannot resurrect it via a different pairing.
    pub fn delete_draft(&mut self, draft_id: i64) -> Result<()> {
        let before = self.drafts.len();
        self.drafts.retain(|d| d.id != draft_id);
        if self.drafts.len() == before {
            return Err(Error::NotFound(format!("Draft {} not found", draft_id)));
        }
        self.overrides.remove(&draft_id);

        // drop uploads no longer referenced by any raw draft
        let referenced: Vec<i64> = self.drafts.iter().filter_map(|d| d.upload_id).collect();
        self.uploads.retain(|id, _| referenced.contains(id));
        Ok(())
    }

    /// Force the draft to update a specific persisted record.
    ///
    /// The selection is recorded in the overlay and is never overwritten by
    /// automatic re-linking.
    pub fn apply_manual_link(&mut self, draft_id: i64, project_id: i64) -> Result<()> {
        self.require_finalized(draft_id)?;
        self.overrides.entry(draft_id).or_default().manual_link = Some(project_id);
        Ok(())
    }

    /// Undo the overrides recorded against a draft.
    pub fn clear_override(&mut self, draft_id: i64) {
        self.overrides.remove(&draft_id);
        self.overrides.retain(|_, ov| !ov.is_empty());
    }

    /// Promote a draft to a brand-new persisted record.
    ///
    /// Creates the record from the draft's current (finalized, overlaid)
    /// fields, then links the draft to it as in a manual link. Returns the
    /// new record id.
    pub async fn promote_draft<S: ProjectStore + ?Sized>(
        &mut self,
        draft_id: i64,
        store: &S,
    ) -> Result<i64> {
        let draft = self
            .finalize()
            .into_iter()
            .find(|d| d.id == draft_id)
            .ok_or_else(|| Error::NotFound(format!("Draft {} not found", draft_id)))?;

        let project_id = store.create_project(&draft.fields).await?;
        self.apply_manual_link(draft_id, project_id)?;
        Ok(project_id)
    }

    fn require_finalized(&self, draft_id: i64) -> Result<()> {
        if self.finalize().iter().any(|d| d.id == draft_id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Draft {} not found", draft_id)))
        }
    }
}

/// Apply one override entry to a finalized draft.
fn apply_override(draft: &mut DraftRecord, ov: &DraftOverride) {
    let edit = &ov.edit;
    if let Some(ref name) = edit.name {
        draft.fields.name = name.clone();
    }
    if let Some(ref organization) = edit.organization {
        draft.fields.organization = Some(organization.clone());
    }
    if let Some(requested) = edit.requested_amount {
        draft.fields.requested_amount = Some(requested);
    }
    if let Some(approved) = edit.approved_amount {
        draft.fields.approved_amount = Some(approved);
    }
    if let Some(ref responsible) = edit.responsible {
        draft.fields.responsible = Some(responsible.clone());
    }
    if let Some(ref rationale) = edit.rationale {
        draft.fields.rationale = Some(rationale.clone());
    }
    if let Some(ref objectives) = edit.objectives {
        draft.fields.objectives = objectives.clone();
    }
    if let Some(ref budget_lines) = edit.budget_lines {
        draft.fields.budget_lines = budget_lines.clone();
    }

    if let Some(project_id) = ov.manual_link {
        draft.linked_project_id = Some(project_id);
        // a merged draft keeps its Linked verdict; the manual link only
        // retargets which record the merge will update
        if draft.status != DraftStatus::Linked {
            draft.status = DraftStatus::Update;
        }
        draft.note = Some(NOTE_MANUAL.to_string());
    }
}

/// Fold a new edit into the stored one; later edits win per field.
fn merge_patch(stored: &mut ProjectPatch, new: ProjectPatch) {
    if new.name.is_some() {
        stored.name = new.name;
    }
    if new.organization.is_some() {
        stored.organization = new.organization;
    }
    if new.requested_amount.is_some() {
        stored.requested_amount = new.requested_amount;
    }
    if new.approved_amount.is_some() {
        stored.approved_amount = new.approved_amount;
    }
    if new.responsible.is_some() {
        stored.responsible = new.responsible;
    }
    if new.rationale.is_some() {
        stored.rationale = new.rationale;
    }
    if new.objectives.is_some() {
        stored.objectives = new.objectives;
    }
    if new.budget_lines.is_some() {
        stored.budget_lines = new.budget_lines;
    }
}
