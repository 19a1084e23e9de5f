//! Fisca CLI - budget-transparency portal backend
//!
//! Usage:
//!   fisca init                                Initialize database
//!   fisca import --budget approvals.csv       Import through reconciliation
//!   fisca projects list                       List persisted projects
//!   fisca serve --port 3000                   Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import {
            proposals,
            budgets,
            commit,
            mock,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_import(&db, &proposals, &budgets, commit, mock, json).await
        }
        Commands::Projects { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(ProjectsAction::List {
                    missing_files: false,
                }) => commands::cmd_projects_list(&db, false),
                Some(ProjectsAction::List { missing_files }) => {
                    commands::cmd_projects_list(&db, missing_files)
                }
                Some(ProjectsAction::Show { id }) => commands::cmd_projects_show(&db, id),
            }
        }
        Commands::Log { limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_log(&db, limit)
        }
        Commands::Extractor { action } => match action {
            ExtractorAction::Health => commands::cmd_extractor_health().await,
            ExtractorAction::Test { file, kind } => {
                commands::cmd_extractor_test(&file, &kind).await
            }
        },
        Commands::Serve {
            port,
            host,
            static_dir,
            cors_origins,
        } => {
            commands::cmd_serve(&cli.db, &host, port, static_dir.as_deref(), cors_origins).await
        }
        Commands::Status => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_status(&db)
        }
    }
}
