//! Prompt library for the extraction service
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/fisca/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! This allows operators to tune extraction prompts without modifying the
//! source, while automatically getting new default prompts on upgrade.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const EXTRACT_PROPOSAL: &str = include_str!("../../../prompts/extract_proposal.md");
    pub const EXTRACT_BUDGET_SHEET: &str = include_str!("../../../prompts/extract_budget_sheet.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Extract one project description from a narrative proposal document
    ExtractProposal,
    /// Extract one item per row group from a budget approval sheet
    ExtractBudgetSheet,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractProposal => "extract_proposal",
            Self::ExtractBudgetSheet => "extract_budget_sheet",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[Self::ExtractProposal, Self::ExtractBudgetSheet]
    }

    /// Get the default embedded content for this prompt
    fn default_content(&self) -> &'static str {
        match self {
            Self::ExtractProposal => defaults::EXTRACT_PROPOSAL,
            Self::ExtractBudgetSheet => defaults::EXTRACT_BUDGET_SHEET,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "extract_proposal" => Ok(Self::ExtractProposal),
            "extract_budget_sheet" => Ok(Self::ExtractBudgetSheet),
            _ => Err(format!("Unknown prompt id: {}", s)),
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Metadata from frontmatter
    pub metadata: PromptMetadata,
    /// The prompt content (markdown body after frontmatter)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
}

impl Prompt {
    /// Render the prompt with template variables replaced
    ///
    /// Simple mustache-style replacement: `{{var}}`.
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        let mut result = self.content.clone();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

/// Prompt library with override resolution and caching
#[derive(Debug, Default)]
pub struct PromptLibrary {
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory where prompt overrides live
    pub fn overrides_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("fisca").join("prompts").join("overrides"))
    }

    /// Get a prompt, preferring an override file when present
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = load_prompt(id)?;
            self.cache.insert(id, prompt);
        }
        Ok(self.cache.get(&id).expect("just inserted"))
    }
}

fn load_prompt(id: PromptId) -> Result<Prompt> {
    if let Some(dir) = PromptLibrary::overrides_dir() {
        let path = dir.join(format!("{}.md", id.as_str()));
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let prompt = parse_prompt(&raw, true)?;
            return Ok(prompt);
        }
    }
    parse_prompt(id.default_content(), false)
}

/// Split YAML frontmatter from the markdown body and parse both
fn parse_prompt(raw: &str, is_override: bool) -> Result<Prompt> {
    let raw = raw.trim_start();
    let rest = raw
        .strip_prefix("---")
        .ok_or_else(|| Error::InvalidData("Prompt file missing frontmatter".into()))?;
    let end = rest
        .find("\n---")
        .ok_or_else(|| Error::InvalidData("Prompt frontmatter not terminated".into()))?;

    let frontmatter = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('\n');

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok(Prompt {
        metadata,
        content: body.to_string(),
        is_override,
    })
}
