//! Cross-source linking
//!
//! Pairs budget-document drafts with project-document drafts describing the
//! same project and merges each pair into one draft. This is a pure
//! derivation: the raw draft set is never mutated, and the finalized view is
//! recomputed from scratch every time the review queue is rendered, so adding
//! a later upload re-links correctly.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::models::{DraftRecord, DraftStatus, IntegrityFlag, SourceKind};
use crate::normalize::names_match;

/// Requested amounts from the two sources are treated as equal within
/// rounding when they differ by at most this much (currency minor units).
pub const BUDGET_MISMATCH_THRESHOLD: f64 = 100.0;

/// Note attached to a clean merge.
pub const NOTE_LINKED: &str = "linked with proposal document";
/// Note attached to a merge whose requested amounts disagree.
pub const NOTE_MISMATCH: &str = "budget mismatch";
/// Note attached to a budget draft that found no proposal counterpart.
pub const NOTE_NO_PROPOSAL: &str = "no proposal document found";
/// Note attached to a proposal draft that found no budget counterpart.
pub const NOTE_NO_BUDGET: &str = "no budget document found";

/// Derive the finalized draft list from the raw accumulated set.
///
/// Budget drafts claim proposal drafts in budget-draft iteration order;
/// each proposal draft can be claimed at most once (first claim wins).
/// Consumed proposal drafts are superseded and dropped from the result.
/// The input is left untouched.
pub fn reconcile(raw: &[DraftRecord]) -> Vec<DraftRecord> {
    // Pass 1: claim proposal drafts, in budget-draft order.
    let mut consumed: HashSet<i64> = HashSet::new();
    let mut pair_for_budget: HashMap<i64, i64> = HashMap::new();

    for budget in raw.iter().filter(|d| d.source_kind == SourceKind::BudgetDocument) {
        let claim = raw
            .iter()
            .filter(|d| d.source_kind == SourceKind::ProjectDocument)
            .filter(|d| !consumed.contains(&d.id))
            .find(|d| names_match(&budget.fields.name, &d.fields.name));

        if let Some(project) = claim {
            consumed.insert(project.id);
            pair_for_budget.insert(budget.id, project.id);
            debug!(
                budget = %budget.fields.name,
                proposal = %project.fields.name,
                "paired budget draft with proposal draft"
            );
        }
    }

    // Pass 2: emit the derived view in raw-set order.
    let mut finalized = Vec::with_capacity(raw.len());
    for draft in raw {
        match draft.source_kind {
            SourceKind::BudgetDocument => {
                if let Some(project_id) = pair_for_budget.get(&draft.id) {
                    let project = raw
                        .iter()
                        .find(|d| d.id == *project_id)
                        .expect("claimed draft is in the raw set");
                    finalized.push(merge(draft, project));
                } else {
                    finalized.push(standalone(draft, NOTE_NO_PROPOSAL));
                }
            }
            SourceKind::ProjectDocument => {
                if !consumed.contains(&draft.id) {
                    finalized.push(standalone(draft, NOTE_NO_BUDGET));
                }
                // consumed drafts are superseded: absorbed into a merge,
                // excluded from every downstream view
            }
        }
    }

    finalized
}

/// Merge a claimed proposal draft into its budget draft.
///
/// The result keeps the budget draft's identity and linked record. Fields
/// are the budget draft's overlaid with the proposal's populated fields,
/// except the approved amount, which always comes from the budget draft:
/// the approval sheet is the authoritative source for money actually
/// released.
fn merge(budget: &DraftRecord, project: &DraftRecord) -> DraftRecord {
    let mut merged = budget.clone();

    overlay_fields(&mut merged, project);
    merged.fields.approved_amount = budget.fields.approved_amount;

    // The merged record is "the budget document, enriched", but the overlay
    // carries the proposal's kind with it; downstream code keys off status.
    merged.source_kind = SourceKind::ProjectDocument;
    merged.status = DraftStatus::Linked;
    merged.source_file = format!("{} + {}", budget.source_file, project.source_file);
    merged.upload_id = project.upload_id;

    match (
        project.fields.requested_amount,
        budget.fields.requested_amount,
    ) {
        (Some(by_project), Some(by_budget))
            if (by_project - by_budget).abs() > BUDGET_MISMATCH_THRESHOLD =>
        {
            merged.integrity_flag = Some(IntegrityFlag {
                requested_by_project_doc: by_project,
                requested_by_budget_doc: by_budget,
            });
            merged.note = Some(NOTE_MISMATCH.to_string());
        }
        _ => {
            merged.integrity_flag = None;
            merged.note = Some(NOTE_LINKED.to_string());
        }
    }

    merged
}

/// Overlay the proposal draft's populated fields onto the merged draft.
fn overlay_fields(merged: &mut DraftRecord, project: &DraftRecord) {
    let src = &project.fields;
    let dst = &mut merged.fields;

    if !src.name.trim().is_empty() {
        dst.name = src.name.clone();
    }
    if src.organization.is_some() {
        dst.organization = src.organization.clone();
    }
    if src.requested_amount.is_some() {
        dst.requested_amount = src.requested_amount;
    }
    if src.approved_amount.is_some() {
        dst.approved_amount = src.approved_amount;
    }
    if src.responsible.is_some() {
        dst.responsible = src.responsible.clone();
    }
    if src.rationale.is_some() {
        dst.rationale = src.rationale.clone();
    }
    if !src.objectives.is_empty() {
        dst.objectives = src.objectives.clone();
    }
    if !src.budget_lines.is_empty() {
        dst.budget_lines = src.budget_lines.clone();
    }
}

/// A draft that survives linking on its own.
fn standalone(draft: &DraftRecord, note: &str) -> DraftRecord {
    let mut out = draft.clone();
    out.status = if out.linked_project_id.is_some() {
        DraftStatus::Update
    } else {
        DraftStatus::New
    };
    out.note = Some(note.to_string());
    out
}
