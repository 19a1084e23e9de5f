//! Canonical project record operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Project, ProjectFields, ProjectPatch};

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    let objectives: String = row.get("objectives")?;
    let budget_lines: String = row.get("budget_lines")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        organization: row.get("organization")?,
        requested_amount: row.get("requested_amount")?,
        approved_amount: row.get("approved_amount")?,
        responsible: row.get("responsible")?,
        rationale: row.get("rationale")?,
        objectives: serde_json::from_str(&objectives).unwrap_or_default(),
        budget_lines: serde_json::from_str(&budget_lines).unwrap_or_default(),
        file_count: row.get("file_count")?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

const PROJECT_COLUMNS: &str = r#"
    p.id, p.name, p.organization, p.requested_amount, p.approved_amount,
    p.responsible, p.rationale, p.objectives, p.budget_lines,
    p.created_at, p.updated_at,
    (SELECT COUNT(*) FROM project_files f WHERE f.project_id = p.id) AS file_count
"#;

impl Database {
    /// Create a new project record from canonical fields
    pub fn create_project_sync(&self, fields: &ProjectFields) -> Result<i64> {
        if fields.name.trim().is_empty() {
            return Err(Error::InvalidData("Project name must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO projects (name, organization, requested_amount, approved_amount,
                                  responsible, rationale, objectives, budget_lines)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                fields.name.trim(),
                fields.organization,
                fields.requested_amount,
                fields.approved_amount,
                fields.responsible,
                fields.rationale,
                serde_json::to_string(&fields.objectives)?,
                serde_json::to_string(&fields.budget_lines)?,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a single project by id
    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM projects p WHERE p.id = ?", PROJECT_COLUMNS);
        let project = conn
            .query_row(&sql, params![id], row_to_project)
            .optional()?;
        Ok(project)
    }

    /// List all projects, in stable fetch order (oldest first)
    ///
    /// The matcher's first-match-wins policy depends on this order being
    /// stable across calls.
    pub fn list_projects_sync(&self) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM projects p ORDER BY p.id", PROJECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// List projects that have no attached files yet
    ///
    /// Backs the manual-link picker in the review UI: records known to be
    /// missing their documents are the usual link targets.
    pub fn list_projects_missing_files(&self) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM projects p \
             WHERE NOT EXISTS (SELECT 1 FROM project_files f WHERE f.project_id = p.id) \
             ORDER BY p.id",
            PROJECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Apply a partial update; `None` fields are left untouched
    pub fn update_project_sync(&self, id: i64, patch: &ProjectPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let conn = self.conn()?;

        // Build dynamic SET clause from populated patch fields
        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = patch.name {
            sets.push("name = ?".to_string());
            values.push(Box::new(name.clone()));
        }
        if let Some(ref organization) = patch.organization {
            sets.push("organization = ?".to_string());
            values.push(Box::new(organization.clone()));
        }
        if let Some(requested) = patch.requested_amount {
            sets.push("requested_amount = ?".to_string());
            values.push(Box::new(requested));
        }
        if let Some(approved) = patch.approved_amount {
            sets.push("approved_amount = ?".to_string());
            values.push(Box::new(approved));
        }
        if let Some(ref responsible) = patch.responsible {
            sets.push("responsible = ?".to_string());
            values.push(Box::new(responsible.clone()));
        }
        if let Some(ref rationale) = patch.rationale {
            sets.push("rationale = ?".to_string());
            values.push(Box::new(rationale.clone()));
        }
        if let Some(ref objectives) = patch.objectives {
            sets.push("objectives = ?".to_string());
            values.push(Box::new(serde_json::to_string(objectives)?));
        }
        if let Some(ref budget_lines) = patch.budget_lines {
            sets.push("budget_lines = ?".to_string());
            values.push(Box::new(serde_json::to_string(budget_lines)?));
        }

        sets.push("updated_at = CURRENT_TIMESTAMP".to_string());

        let sql = format!("UPDATE projects SET {} WHERE id = ?", sets.join(", "));
        values.push(Box::new(id));

        let changed = conn.execute(
            &sql,
            rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Project {} not found", id)));
        }
        Ok(())
    }

    /// Delete a project and its attached files
    pub fn delete_project(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM project_files WHERE project_id = ?", params![id])?;
        let changed = conn.execute("DELETE FROM projects WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Project {} not found", id)));
        }
        Ok(())
    }
}
