//! Serve command implementation

use std::path::Path;

use anyhow::Result;
use fisca_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    cors_origins: Vec<String>,
) -> Result<()> {
    let db = open_db(db_path)?;

    println!("🚀 Starting Fisca server on http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Serving static files from {}", dir);
    }

    let config = ServerConfig {
        allowed_origins: cors_origins,
    };

    fisca_server::serve(db, host, port, static_dir, config).await
}
