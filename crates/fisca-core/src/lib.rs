//! Fisca Core Library
//!
//! Shared functionality for the Fisca budget-transparency portal:
//! - Import reconciliation engine (normalizer, matcher, cross-source linker,
//!   review session, committer)
//! - Pluggable document extraction backends (OpenAI-compatible servers, mock)
//! - Prompt library for customizable extraction prompts
//! - SQLite-backed project store with attachments and a commit audit trail

pub mod commit;
pub mod config;
pub mod error;
pub mod extract;
pub mod linker;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod session;
pub mod store;

/// Test utilities including the mock extraction server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use commit::{CommitAction, CommitOutcome, CommitReport, Committer};
pub use config::ExtractorSettings;
pub use error::{Error, Result};
pub use extract::{
    ExtractedBudgetLine, ExtractedItem, ExtractionBackend, ExtractorClient, MockExtractor,
    OpenAICompatibleExtractor,
};
pub use linker::{reconcile, BUDGET_MISMATCH_THRESHOLD};
pub use matcher::{find_existing_match, match_existing};
pub use models::{
    AttachedFile, BudgetLine, DraftRecord, DraftStatus, IntegrityFlag, Project, ProjectFields,
    ProjectPatch, SourceKind, SourceUpload,
};
pub use normalize::{names_match, normalize};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use session::{IngestOutcome, ReviewSession};
pub use store::{Database, ImportLogEntry, ProjectStore};
