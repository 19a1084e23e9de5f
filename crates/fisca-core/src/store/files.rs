//! Attached document blob operations
//!
//! Attachments are deduplicated by content hash per project, so re-running a
//! partially failed commit never stores the same document twice.

use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::AttachedFile;

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<AttachedFile> {
    let uploaded_at: String = row.get("uploaded_at")?;
    Ok(AttachedFile {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        file_name: row.get("file_name")?,
        content_hash: row.get("content_hash")?,
        size_bytes: row.get("size_bytes")?,
        uploaded_at: parse_datetime(&uploaded_at),
    })
}

impl Database {
    /// Upload a file and attach it to a project
    ///
    /// Returns the existing file id when the same content is already
    /// attached to the project.
    pub fn upload_file_sync(&self, project_id: i64, file_name: &str, bytes: &[u8]) -> Result<i64> {
        if bytes.is_empty() {
            return Err(Error::InvalidData("Refusing to attach an empty file".into()));
        }

        let conn = self.conn()?;

        // The referenced project must exist
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM projects WHERE id = ?",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("Project {} not found", project_id)));
        }

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let content_hash = hex::encode(hasher.finalize());

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM project_files WHERE project_id = ? AND content_hash = ?",
                params![project_id, content_hash],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(file_id) = existing {
            debug!(project_id, file_id, "identical file already attached");
            return Ok(file_id);
        }

        conn.execute(
            r#"
            INSERT INTO project_files (project_id, file_name, content_hash, size_bytes, data)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![project_id, file_name, content_hash, bytes.len() as i64, bytes],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List files attached to a project (metadata only)
    pub fn list_files(&self, project_id: i64) -> Result<Vec<AttachedFile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, file_name, content_hash, size_bytes, uploaded_at \
             FROM project_files WHERE project_id = ? ORDER BY id",
        )?;
        let files = stmt
            .query_map(params![project_id], row_to_file)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Fetch one attached file with its content
    pub fn get_file(&self, file_id: i64) -> Result<Option<(AttachedFile, Vec<u8>)>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                "SELECT id, project_id, file_name, content_hash, size_bytes, uploaded_at, data \
                 FROM project_files WHERE id = ?",
                params![file_id],
                |row| {
                    let file = row_to_file(row)?;
                    let data: Vec<u8> = row.get("data")?;
                    Ok((file, data))
                },
            )
            .optional()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectFields;

    fn seeded_db() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let id = db
            .create_project_sync(&ProjectFields {
                name: "Tree Planting Day".to_string(),
                ..Default::default()
            })
            .unwrap();
        (db, id)
    }

    #[test]
    fn test_upload_and_list() {
        let (db, project_id) = seeded_db();
        let file_id = db
            .upload_file_sync(project_id, "proposal.pdf", b"%PDF-1.4 content")
            .unwrap();

        let files = db.list_files(project_id).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, file_id);
        assert_eq!(files[0].file_name, "proposal.pdf");
        assert_eq!(files[0].size_bytes, 16);

        let (_, data) = db.get_file(file_id).unwrap().unwrap();
        assert_eq!(data, b"%PDF-1.4 content");
    }

    #[test]
    fn test_identical_content_is_deduplicated() {
        let (db, project_id) = seeded_db();
        let first = db
            .upload_file_sync(project_id, "proposal.pdf", b"%PDF-1.4 content")
            .unwrap();
        // same bytes under a different name: still the same attachment
        let second = db
            .upload_file_sync(project_id, "proposal_copy.pdf", b"%PDF-1.4 content")
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(db.list_files(project_id).unwrap().len(), 1);
    }

    #[test]
    fn test_upload_to_missing_project_errors() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.upload_file_sync(999, "a.pdf", b"data"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_file_rejected() {
        let (db, project_id) = seeded_db();
        assert!(db.upload_file_sync(project_id, "a.pdf", b"").is_err());
    }
}
