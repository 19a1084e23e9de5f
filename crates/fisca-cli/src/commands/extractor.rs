//! Extraction backend test commands

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fisca_core::extract::prepare_payload;
use fisca_core::models::SourceUpload;
use fisca_core::{ExtractionBackend, ExtractorSettings, SourceKind};

pub async fn cmd_extractor_health() -> Result<()> {
    let settings = ExtractorSettings::load();
    let client = settings.build_client().ok_or_else(|| {
        anyhow::anyhow!("Extraction backend not configured (set EXTRACTOR_HOST)")
    })?;

    println!("🔌 Backend: {} (model: {})", client.host(), client.model());
    if client.health_check().await {
        println!("✅ Backend is reachable");
        Ok(())
    } else {
        anyhow::bail!("Backend did not respond to the health check");
    }
}

pub async fn cmd_extractor_test(file: &Path, kind: &str) -> Result<()> {
    let kind: SourceKind = kind
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let client = ExtractorSettings::load().build_client().ok_or_else(|| {
        anyhow::anyhow!("Extraction backend not configured (set EXTRACTOR_HOST)")
    })?;

    let bytes =
        fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let upload = SourceUpload {
        id: 0,
        file_name: file_name.clone(),
        mime: None,
        bytes,
    };
    let payload = prepare_payload(&upload)?;

    println!("📄 Extracting {} as {}...", file_name, kind);
    let items = client.extract_items(&file_name, &payload, kind).await?;

    println!("✅ {} item(s) extracted:", items.len());
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}
