//! Extraction service response types
//!
//! This is the fixed, versioned schema of the extraction contract. The
//! service returns one JSON object per logical item; every field except the
//! schema itself is optional, and coercion happens here at the adapter
//! boundary rather than anywhere downstream.

use serde::{Deserialize, Serialize};

use crate::models::{BudgetLine, ProjectFields};

/// One budget breakdown row as the service reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedBudgetLine {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

/// One logical item extracted from a document
///
/// A spreadsheet file may yield many items; a proposal file yields exactly
/// one. Missing or empty fields are null, never fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedItem {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub budget_requested: Option<f64>,
    #[serde(default)]
    pub budget_approved: Option<f64>,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub budget_breakdown: Vec<ExtractedBudgetLine>,
}

impl ExtractedItem {
    /// True when the item carries nothing usable (no name at all)
    pub fn is_empty(&self) -> bool {
        self.project_name
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
    }

    /// Coerce into canonical project fields
    pub fn into_fields(self) -> ProjectFields {
        ProjectFields {
            name: self
                .project_name
                .map(|n| n.trim().to_string())
                .unwrap_or_default(),
            organization: none_if_blank(self.organization),
            requested_amount: self.budget_requested,
            approved_amount: self.budget_approved,
            responsible: none_if_blank(self.responsible),
            rationale: none_if_blank(self.rationale),
            objectives: self
                .objectives
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            budget_lines: self
                .budget_breakdown
                .into_iter()
                .filter_map(|line| {
                    let item = line.item.map(|i| i.trim().to_string()).unwrap_or_default();
                    if item.is_empty() {
                        return None;
                    }
                    Some(BudgetLine {
                        item,
                        amount: line.amount,
                        unit: line.unit,
                        cost_per_unit: line.cost_per_unit,
                        total: line.total,
                    })
                })
                .collect(),
        }
    }
}

fn none_if_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
