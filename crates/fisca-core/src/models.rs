//! Domain models for Fisca

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which upload collection a document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Narrative proposal file (typically PDF) describing one project
    ProjectDocument,
    /// Tabular file listing requested/approved amounts for many projects
    BudgetDocument,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectDocument => "project_document",
            Self::BudgetDocument => "budget_document",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project_document" | "project" | "proposal" => Ok(Self::ProjectDocument),
            "budget_document" | "budget" => Ok(Self::BudgetDocument),
            _ => Err(format!("Unknown source kind: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation state of a draft record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    /// No persisted record matched; commit will create one
    New,
    /// Matched an existing persisted record; commit will update it
    Update,
    /// Merged from a budget draft and a proposal draft
    Linked,
    /// Absorbed into another draft during linking; hidden everywhere
    Superseded,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Update => "update",
            Self::Linked => "linked",
            Self::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of a budget breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub item: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

/// Canonical project attributes shared by drafts and persisted records
///
/// Tolerant of partial population: budget documents rarely populate narrative
/// fields, project documents rarely populate the approved amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFields {
    pub name: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub requested_amount: Option<f64>,
    #[serde(default)]
    pub approved_amount: Option<f64>,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub budget_lines: Vec<BudgetLine>,
}

/// Recorded discrepancy between the requested amounts stated by the two
/// source documents for the same project
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrityFlag {
    pub requested_by_project_doc: f64,
    pub requested_by_budget_doc: f64,
}

/// An extracted-but-unconfirmed project description
///
/// Lives only inside a reconciliation session: created by extraction,
/// rewritten by the linker and review actions, consumed by commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Session-unique identifier (not persisted)
    pub id: i64,
    /// Originating file name; composite after a merge ("a.csv + b.pdf")
    pub source_file: String,
    pub source_kind: SourceKind,
    pub status: DraftStatus,
    pub fields: ProjectFields,
    /// Persisted record this draft will update; absent means create
    #[serde(default)]
    pub linked_project_id: Option<i64>,
    #[serde(default)]
    pub integrity_flag: Option<IntegrityFlag>,
    /// Human-readable rationale surfaced in the review UI
    #[serde(default)]
    pub note: Option<String>,
    /// Raw proposal file that contributed to this draft, if any
    #[serde(default)]
    pub upload_id: Option<i64>,
}

impl DraftRecord {
    /// Create a fresh draft as the extraction adapter produces it
    pub fn new(id: i64, source_file: &str, source_kind: SourceKind, fields: ProjectFields) -> Self {
        Self {
            id,
            source_file: source_file.to_string(),
            source_kind,
            status: DraftStatus::New,
            fields,
            linked_project_id: None,
            integrity_flag: None,
            note: None,
            upload_id: None,
        }
    }
}

/// A canonical persisted project record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub organization: Option<String>,
    pub requested_amount: Option<f64>,
    pub approved_amount: Option<f64>,
    pub responsible: Option<String>,
    pub rationale: Option<String>,
    pub objectives: Vec<String>,
    pub budget_lines: Vec<BudgetLine>,
    /// Number of attached files
    pub file_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn fields(&self) -> ProjectFields {
        ProjectFields {
            name: self.name.clone(),
            organization: self.organization.clone(),
            requested_amount: self.requested_amount,
            approved_amount: self.approved_amount,
            responsible: self.responsible.clone(),
            rationale: self.rationale.clone(),
            objectives: self.objectives.clone(),
            budget_lines: self.budget_lines.clone(),
        }
    }
}

/// Partial update applied to a persisted project
///
/// `None` fields are left untouched. Which fields the committer populates
/// depends on the draft's merge state (see `commit`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub requested_amount: Option<f64>,
    pub approved_amount: Option<f64>,
    pub responsible: Option<String>,
    pub rationale: Option<String>,
    pub objectives: Option<Vec<String>>,
    pub budget_lines: Option<Vec<BudgetLine>>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.organization.is_none()
            && self.requested_amount.is_none()
            && self.approved_amount.is_none()
            && self.responsible.is_none()
            && self.rationale.is_none()
            && self.objectives.is_none()
            && self.budget_lines.is_none()
    }
}

/// A file attached to a persisted project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachedFile {
    pub id: i64,
    pub project_id: i64,
    pub file_name: String,
    /// SHA-256 of the file content, hex encoded
    pub content_hash: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// A raw uploaded document held by a review session until commit
#[derive(Debug, Clone)]
pub struct SourceUpload {
    pub id: i64,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}
