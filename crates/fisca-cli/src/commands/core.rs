//! Init, status and log command implementations

use std::path::Path;

use anyhow::Result;
use fisca_core::store::Database;

use super::open_db;

pub fn cmd_init(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    println!("✅ Database initialized at {}", db.path());
    Ok(())
}

pub fn cmd_status(db: &Database) -> Result<()> {
    let projects = db.list_projects_sync()?;
    let missing = db.list_projects_missing_files()?;
    let total_files: i64 = projects.iter().map(|p| p.file_count).sum();

    println!("📊 Fisca status");
    println!("   Projects: {}", projects.len());
    println!("   Attached files: {}", total_files);
    println!("   Projects missing documents: {}", missing.len());

    let recent = db.list_import_log(5)?;
    if !recent.is_empty() {
        println!();
        println!("   Recent commits:");
        for entry in recent {
            println!(
                "   - [{}] {} ({})",
                entry.committed_at.format("%Y-%m-%d %H:%M"),
                entry.source_file,
                entry.action
            );
        }
    }

    Ok(())
}

pub fn cmd_log(db: &Database, limit: i64) -> Result<()> {
    let entries = db.list_import_log(limit)?;
    if entries.is_empty() {
        println!("No commits recorded yet.");
        return Ok(());
    }

    println!("{:<20} {:<30} {:<8} {:<10} ERROR", "WHEN", "SOURCE", "ACTION", "PROJECT");
    for entry in entries {
        println!(
            "{:<20} {:<30} {:<8} {:<10} {}",
            entry.committed_at.format("%Y-%m-%d %H:%M:%S"),
            entry.source_file,
            entry.action,
            entry
                .project_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            entry.error.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
