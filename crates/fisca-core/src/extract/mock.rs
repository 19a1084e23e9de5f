//! Mock extraction backend for testing
//!
//! Deterministic extraction without a running service. Budget sheets are
//! read as plain CSV (`name[,organization],requested[,approved]`); proposal
//! text is scanned line-by-line for `key: value` pairs. Useful for unit
//! tests and offline development.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::SourceKind;

use super::types::ExtractedItem;
use super::{DocumentPayload, ExtractionBackend};

/// Mock extraction backend
#[derive(Clone, Default)]
pub struct MockExtractor {
    /// Whether health_check should return true
    pub healthy: bool,
}

impl MockExtractor {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self { healthy: true }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }

    fn extract_sheet(&self, text: &str) -> Vec<ExtractedItem> {
        let mut items = Vec::new();
        for line in text.lines() {
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            if cols.is_empty() || cols[0].is_empty() {
                continue;
            }
            // skip a header row
            if cols[0].eq_ignore_ascii_case("name") || cols[0].eq_ignore_ascii_case("project") {
                continue;
            }

            let item = match cols.len() {
                0 | 1 => continue,
                2 => ExtractedItem {
                    project_name: Some(cols[0].to_string()),
                    budget_requested: parse_amount(cols[1]),
                    ..Default::default()
                },
                3 => ExtractedItem {
                    project_name: Some(cols[0].to_string()),
                    budget_requested: parse_amount(cols[1]),
                    budget_approved: parse_amount(cols[2]),
                    ..Default::default()
                },
                _ => ExtractedItem {
                    project_name: Some(cols[0].to_string()),
                    organization: Some(cols[1].to_string()).filter(|s| !s.is_empty()),
                    budget_requested: parse_amount(cols[2]),
                    budget_approved: parse_amount(cols[3]),
                    ..Default::default()
                },
            };
            items.push(item);
        }
        items
    }

    fn extract_proposal(&self, file_name: &str, text: &str) -> ExtractedItem {
        let mut item = ExtractedItem::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                match key.trim().to_lowercase().as_str() {
                    "organization" => item.organization = Some(value.to_string()),
                    "requested" => item.budget_requested = parse_amount(value),
                    "responsible" => item.responsible = Some(value.to_string()),
                    "rationale" => item.rationale = Some(value.to_string()),
                    "objective" => item.objectives.push(value.to_string()),
                    _ => {}
                }
                continue;
            }
            if item.project_name.is_none() {
                item.project_name = Some(line.to_string());
            }
        }

        if item.project_name.is_none() {
            // binary payloads carry no readable text; fall back to the stem
            let stem = file_name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(file_name);
            item.project_name = Some(stem.replace(['-', '_'], " "));
        }
        item
    }
}

/// Parse an amount string, handling currency symbols and separators
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().replace(['$', ',', ' '], "");
    cleaned.parse::<f64>().ok()
}

#[async_trait]
impl ExtractionBackend for MockExtractor {
    async fn extract_items(
        &self,
        file_name: &str,
        payload: &DocumentPayload,
        kind: SourceKind,
    ) -> Result<Vec<ExtractedItem>> {
        let text = match payload {
            DocumentPayload::Text(text) => text.clone(),
            DocumentPayload::Binary { .. } => String::new(),
        };

        match kind {
            SourceKind::BudgetDocument => Ok(self.extract_sheet(&text)),
            SourceKind::ProjectDocument => Ok(vec![self.extract_proposal(file_name, &text)]),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
