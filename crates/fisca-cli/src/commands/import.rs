//! Import command implementation
//!
//! Drives the full reconciliation pipeline from the command line: extract
//! proposals, then budget sheets, print the reconciled review queue, and
//! commit on request.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fisca_core::session::{IngestOutcome, ReviewSession};
use fisca_core::store::Database;
use fisca_core::{
    CommitAction, CommitReport, Committer, DraftRecord, ExtractorClient, ExtractorSettings,
    SourceKind,
};

pub async fn cmd_import(
    db: &Database,
    proposals: &[PathBuf],
    budgets: &[PathBuf],
    commit: bool,
    mock: bool,
    json: bool,
) -> Result<()> {
    if proposals.is_empty() && budgets.is_empty() {
        anyhow::bail!("Nothing to import. Pass --proposal and/or --budget files.");
    }

    let extractor = if mock {
        ExtractorClient::mock()
    } else {
        ExtractorSettings::load().build_client().ok_or_else(|| {
            anyhow::anyhow!(
                "Extraction backend not configured.\n\
                 Set EXTRACTOR_HOST (and optionally EXTRACTOR_MODEL, EXTRACTOR_API_KEY),\n\
                 or pass --mock for offline testing."
            )
        })?
    };

    let mut session = ReviewSession::begin(db).await?;
    println!(
        "📥 Importing against {} existing project(s)...",
        session.existing().len()
    );

    // Stage one: proposals. Stage two: budget sheets. Each file is
    // extracted with its own awaited call so progress is per file.
    run_stage(
        &mut session,
        proposals,
        SourceKind::ProjectDocument,
        &extractor,
        "proposal",
    )
    .await?;
    run_stage(
        &mut session,
        budgets,
        SourceKind::BudgetDocument,
        &extractor,
        "budget sheet",
    )
    .await?;

    let finalized = session.finalize();

    if json {
        println!("{}", serde_json::to_string_pretty(&finalized)?);
    } else {
        print_review_queue(&finalized);
    }

    if !commit {
        println!();
        println!("💡 Review complete. Re-run with --commit to write these drafts.");
        return Ok(());
    }

    println!();
    println!("💾 Committing {} draft(s)...", finalized.len());
    let report = Committer::new(db).commit_session(session).await;

    for outcome in &report.outcomes {
        let (action, project_id, error) = match &outcome.action {
            CommitAction::Created { project_id, .. } => ("created", Some(*project_id), None),
            CommitAction::Updated { project_id, .. } => ("updated", Some(*project_id), None),
            CommitAction::Failed { error } => ("failed", None, Some(error.as_str())),
        };
        db.log_commit(&outcome.source_file, action, project_id, error)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

async fn run_stage(
    session: &mut ReviewSession,
    paths: &[PathBuf],
    kind: SourceKind,
    extractor: &ExtractorClient,
    label: &str,
) -> Result<()> {
    if paths.is_empty() {
        return Ok(());
    }

    println!();
    println!("📄 Extracting {} {} file(s)...", paths.len(), label);

    let files = read_files(paths)?;
    let outcomes = session.ingest_batch(files, kind, extractor).await;
    for outcome in &outcomes {
        print_outcome(outcome);
    }
    Ok(())
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<(String, Option<String>, Vec<u8>)>> {
    paths
        .iter()
        .map(|path| {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            Ok((file_name(path), None, bytes))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_outcome(outcome: &IngestOutcome) {
    match &outcome.error {
        Some(error) => println!("   ❌ {}: {}", outcome.file_name, error),
        None if outcome.items_skipped > 0 => println!(
            "   ✅ {}: {} draft(s), {} item(s) without a name skipped",
            outcome.file_name, outcome.drafts_added, outcome.items_skipped
        ),
        None => println!(
            "   ✅ {}: {} draft(s)",
            outcome.file_name, outcome.drafts_added
        ),
    }
}

fn print_review_queue(drafts: &[DraftRecord]) {
    println!();
    if drafts.is_empty() {
        println!("Review queue is empty.");
        return;
    }

    println!("📋 Review queue ({} draft(s)):", drafts.len());
    println!(
        "{:<5} {:<8} {:<35} {:>12} {:>12}  NOTE",
        "ID", "STATUS", "NAME", "REQUESTED", "APPROVED"
    );
    for draft in drafts {
        let warning = if draft.integrity_flag.is_some() {
            "⚠️  "
        } else {
            ""
        };
        println!(
            "{:<5} {:<8} {:<35} {:>12} {:>12}  {}{}",
            draft.id,
            draft.status.to_string(),
            truncate(&draft.fields.name, 34),
            fmt_amount(draft.fields.requested_amount),
            fmt_amount(draft.fields.approved_amount),
            warning,
            draft.note.as_deref().unwrap_or("")
        );
        if let Some(flag) = draft.integrity_flag {
            println!(
                "      └ requested: {} (proposal) vs {} (budget sheet)",
                flag.requested_by_project_doc, flag.requested_by_budget_doc
            );
        }
    }
}

fn print_report(report: &CommitReport) {
    println!("✅ Commit finished");
    println!("   Created: {}", report.created);
    println!("   Updated: {}", report.updated);
    println!("   Files attached: {}", report.files_attached);
    if report.failed > 0 {
        println!("   ❌ Failed: {}", report.failed);
        for outcome in &report.outcomes {
            if let CommitAction::Failed { error } = &outcome.action {
                println!("      - {}: {}", outcome.project_name, error);
            }
        }
        println!("   Re-run the import for the failed items once the cause is fixed.");
    }
}

fn fmt_amount(amount: Option<f64>) -> String {
    match amount {
        Some(a) => format!("{:.2}", a),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    } else {
        s.to_string()
    }
}
