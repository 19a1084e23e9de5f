//! Existing-record matching
//!
//! Decides whether a freshly extracted draft describes a project that is
//! already persisted. Runs once per draft, against a snapshot of the
//! persisted records fetched at session start, independently of source kind.

use tracing::debug;

use crate::models::{DraftRecord, DraftStatus, Project};
use crate::normalize::names_match;

/// Find the first persisted record whose name matches `name`.
///
/// The list order is part of the policy: no scoring or ranking happens,
/// the first record in fetch order satisfying the containment rule wins.
/// Returns `None` when the name is below the length floor or nothing
/// matches.
pub fn find_existing_match<'a>(name: &str, existing: &'a [Project]) -> Option<&'a Project> {
    existing.iter().find(|p| names_match(name, &p.name))
}

/// Match a draft against the persisted snapshot and assign its initial state.
///
/// On match: `status = Update`, `linked_project_id` set, note records which
/// persisted name matched. No match: `status = New`.
pub fn match_existing(draft: &mut DraftRecord, existing: &[Project]) {
    match find_existing_match(&draft.fields.name, existing) {
        Some(project) => {
            debug!(
                draft = %draft.fields.name,
                project_id = project.id,
                existing = %project.name,
                "draft matches persisted project"
            );
            draft.status = DraftStatus::Update;
            draft.linked_project_id = Some(project.id);
            draft.note = Some(format!("matches existing project \"{}\"", project.name));
        }
        None => {
            draft.status = DraftStatus::New;
        }
    }
}
