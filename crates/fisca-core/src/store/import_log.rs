//! Commit audit trail
//!
//! One row per committed draft, success or failure. The review queue makes
//! automatic decisions inspectable before commit; this log keeps them
//! inspectable after.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::Serialize;

use super::{parse_datetime, Database};
use crate::error::Result;

/// One entry of the commit audit trail
#[derive(Debug, Clone, Serialize)]
pub struct ImportLogEntry {
    pub id: i64,
    pub committed_at: DateTime<Utc>,
    pub source_file: String,
    /// created, updated or failed
    pub action: String,
    pub project_id: Option<i64>,
    pub error: Option<String>,
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<ImportLogEntry> {
    let committed_at: String = row.get("committed_at")?;
    Ok(ImportLogEntry {
        id: row.get("id")?,
        committed_at: parse_datetime(&committed_at),
        source_file: row.get("source_file")?,
        action: row.get("action")?,
        project_id: row.get("project_id")?,
        error: row.get("error")?,
    })
}

impl Database {
    /// Record the outcome of committing one draft
    pub fn log_commit(
        &self,
        source_file: &str,
        action: &str,
        project_id: Option<i64>,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO import_log (source_file, action, project_id, error) VALUES (?, ?, ?, ?)",
            params![source_file, action, project_id, error],
        )?;
        Ok(())
    }

    /// List recent commit log entries, newest first
    pub fn list_import_log(&self, limit: i64) -> Result<Vec<ImportLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, committed_at, source_file, action, project_id, error \
             FROM import_log ORDER BY id DESC LIMIT ?",
        )?;
        let entries = stmt
            .query_map(params![limit], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
