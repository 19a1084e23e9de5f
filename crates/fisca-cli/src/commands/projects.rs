//! Project listing command implementations

use anyhow::Result;
use fisca_core::store::Database;

pub fn cmd_projects_list(db: &Database, missing_files: bool) -> Result<()> {
    let projects = if missing_files {
        db.list_projects_missing_files()?
    } else {
        db.list_projects_sync()?
    };

    if projects.is_empty() {
        println!("No projects yet. Run 'fisca import' to add some.");
        return Ok(());
    }

    println!(
        "{:<5} {:<35} {:<20} {:>12} {:>12} {:>6}",
        "ID", "NAME", "ORGANIZATION", "REQUESTED", "APPROVED", "FILES"
    );
    for p in projects {
        println!(
            "{:<5} {:<35} {:<20} {:>12} {:>12} {:>6}",
            p.id,
            truncate(&p.name, 34),
            truncate(p.organization.as_deref().unwrap_or("-"), 19),
            fmt_amount(p.requested_amount),
            fmt_amount(p.approved_amount),
            p.file_count
        );
    }
    Ok(())
}

pub fn cmd_projects_show(db: &Database, id: i64) -> Result<()> {
    let project = db
        .get_project(id)?
        .ok_or_else(|| anyhow::anyhow!("Project {} not found", id))?;

    println!("Project #{}: {}", project.id, project.name);
    if let Some(ref org) = project.organization {
        println!("  Organization: {}", org);
    }
    if let Some(ref responsible) = project.responsible {
        println!("  Responsible:  {}", responsible);
    }
    println!("  Requested:    {}", fmt_amount(project.requested_amount));
    println!("  Approved:     {}", fmt_amount(project.approved_amount));
    if let Some(ref rationale) = project.rationale {
        println!("  Rationale:    {}", rationale);
    }
    if !project.objectives.is_empty() {
        println!("  Objectives:");
        for objective in &project.objectives {
            println!("    - {}", objective);
        }
    }
    if !project.budget_lines.is_empty() {
        println!("  Budget lines:");
        for line in &project.budget_lines {
            println!("    - {} ({})", line.item, fmt_amount(line.total));
        }
    }

    let files = db.list_files(id)?;
    if files.is_empty() {
        println!("  Files:        none");
    } else {
        println!("  Files:");
        for file in files {
            println!(
                "    - #{} {} ({} bytes, sha256 {})",
                file.id,
                file.file_name,
                file.size_bytes,
                &file.content_hash[..12]
            );
        }
    }
    Ok(())
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
