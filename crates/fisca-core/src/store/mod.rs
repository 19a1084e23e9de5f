//! Persistent store for canonical project records
//!
//! This module is organized by domain:
//! - `projects` - Canonical project record CRUD
//! - `files` - Attached document blobs (content-hash deduplicated)
//! - `import_log` - Per-draft commit audit trail
//!
//! The reconciliation engine only ever sees the [`ProjectStore`] trait; the
//! SQLite-backed [`Database`] is the shipped implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;
use crate::models::{Project, ProjectFields, ProjectPatch};

mod files;
mod import_log;
mod projects;

pub use import_log::ImportLogEntry;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// The store contract the reconciliation engine is written against.
///
/// No transactional guarantees are assumed across calls; the committer is
/// explicitly non-transactional and reports per-item outcomes instead.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch all persisted records, in stable fetch order
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Create a new record from canonical fields, returning its id
    async fn create_project(&self, fields: &ProjectFields) -> Result<i64>;

    /// Apply a partial update to an existing record
    async fn update_project(&self, id: i64, patch: &ProjectPatch) -> Result<()>;

    /// Upload a file and attach it to a record, returning the file id
    async fn upload_file(&self, project_id: i64, file_name: &str, bytes: &[u8]) -> Result<i64>;
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because pooled
    /// connections each see their own private in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("fisca_test_{}_{}.db", std::process::id(), id));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            PRAGMA synchronous = NORMAL;

            -- Canonical project records
            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                organization TEXT,
                requested_amount REAL,
                approved_amount REAL,
                responsible TEXT,
                rationale TEXT,
                objectives TEXT NOT NULL DEFAULT '[]',     -- JSON array of strings
                budget_lines TEXT NOT NULL DEFAULT '[]',   -- JSON array of line objects
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name);

            -- Attached document blobs
            CREATE TABLE IF NOT EXISTS project_files (
                id INTEGER PRIMARY KEY,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                file_name TEXT NOT NULL,
                content_hash TEXT NOT NULL,                -- SHA-256, hex
                size_bytes INTEGER NOT NULL,
                data BLOB NOT NULL,
                uploaded_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(project_id, content_hash)
            );

            CREATE INDEX IF NOT EXISTS idx_project_files_project ON project_files(project_id);

            -- Commit audit trail, one row per committed draft
            CREATE TABLE IF NOT EXISTS import_log (
                id INTEGER PRIMARY KEY,
                committed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                source_file TEXT NOT NULL,
                action TEXT NOT NULL,                      -- created, updated, failed
                project_id INTEGER,
                error TEXT
            );
            "#,
        )?;

        info!("Database migrations complete");
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for Database {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.list_projects_sync()
    }

    async fn create_project(&self, fields: &ProjectFields) -> Result<i64> {
        self.create_project_sync(fields)
    }

    async fn update_project(&self, id: i64, patch: &ProjectPatch) -> Result<()> {
        self.update_project_sync(id, patch)
    }

    async fn upload_file(&self, project_id: i64, file_name: &str, bytes: &[u8]) -> Result<i64> {
        self.upload_file_sync(project_id, file_name, bytes)
    }
}
