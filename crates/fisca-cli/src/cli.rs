//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fisca")]
#[command(about = "Fisca - budget-transparency portal backend", version)]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true, default_value = "fisca.db")]
    pub db: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import documents through the reconciliation engine
    ///
    /// Proposals are extracted first, then budget sheets; the reconciled
    /// review queue is printed before anything is written. Nothing is
    /// committed without --commit.
    Import {
        /// Project proposal files (PDF or text), repeatable
        #[arg(long = "proposal", value_name = "FILE")]
        proposals: Vec<PathBuf>,

        /// Budget approval sheets (CSV), repeatable
        #[arg(long = "budget", value_name = "FILE")]
        budgets: Vec<PathBuf>,

        /// Write the reconciled drafts to the store
        #[arg(long)]
        commit: bool,

        /// Use the built-in mock extractor instead of the configured backend
        #[arg(long)]
        mock: bool,

        /// Print the review queue and commit report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List or inspect persisted projects
    Projects {
        #[command(subcommand)]
        action: Option<ProjectsAction>,
    },

    /// Show the recent commit audit trail
    Log {
        /// Maximum entries to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Test the configured extraction backend
    Extractor {
        #[command(subcommand)]
        action: ExtractorAction,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory with static frontend files to serve
        #[arg(long)]
        static_dir: Option<String>,

        /// Allowed CORS origin, repeatable
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
    },

    /// Show database status
    Status,
}

#[derive(Subcommand)]
pub enum ProjectsAction {
    /// List all projects
    List {
        /// Only projects with no attached files
        #[arg(long)]
        missing_files: bool,
    },
    /// Show one project with its attachments
    Show { id: i64 },
}

#[derive(Subcommand)]
pub enum ExtractorAction {
    /// Check backend availability
    Health,
    /// Extract a single file and print the items
    Test {
        /// File to extract
        #[arg(long)]
        file: PathBuf,

        /// Which collection the file belongs to: project or budget
        #[arg(long, default_value = "budget")]
        kind: String,
    },
}
