//! Command implementations

mod core;
mod extractor;
mod import;
mod projects;
mod serve;

pub use core::*;
pub use extractor::*;
pub use import::*;
pub use projects::*;
pub use serve::*;

use std::path::Path;

use anyhow::{Context, Result};
use fisca_core::store::Database;

/// Open the database, creating it if necessary
pub fn open_db(path: &Path) -> Result<Database> {
    Database::new(&path.to_string_lossy())
        .with_context(|| format!("Failed to open database: {}", path.display()))
}
