//! Extractor configuration
//!
//! Settings resolve in two layers: a TOML file in the data directory
//! (~/.local/share/fisca/config/extractor.toml), then environment variables
//! on top. Environment wins, so deployments can override a checked-in file.
//!
//! ```toml
//! backend = "openai_compatible"
//! host = "https://extraction.example.com"
//! model = "gpt-4o-mini"
//! ```

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::extract::ExtractorClient;

/// Resolved extractor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// Backend kind: openai_compatible or mock
    pub backend: String,
    /// Server URL (required for openai_compatible)
    pub host: Option<String>,
    /// Model name
    pub model: String,
    /// API key, if the server requires one
    pub api_key: Option<String>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            backend: "openai_compatible".to_string(),
            host: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
        }
    }
}

impl ExtractorSettings {
    /// Path of the optional config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("fisca").join("config").join("extractor.toml"))
    }

    /// Load settings: defaults, then file, then environment
    pub fn load() -> Self {
        let mut settings = Self::from_file().unwrap_or_default();

        if let Ok(backend) = std::env::var("EXTRACTOR_BACKEND") {
            settings.backend = backend;
        }
        if let Ok(host) = std::env::var("EXTRACTOR_HOST") {
            settings.host = Some(host);
        }
        if let Ok(model) = std::env::var("EXTRACTOR_MODEL") {
            settings.model = model;
        }
        if let Ok(api_key) = std::env::var("EXTRACTOR_API_KEY") {
            settings.api_key = Some(api_key);
        }

        settings
    }

    fn from_file() -> Option<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return None;
        }
        let raw = fs::read_to_string(&path).ok()?;
        match toml::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid extractor config, using defaults");
                None
            }
        }
    }

    /// Build an extractor client from these settings
    ///
    /// Returns None when the configured backend needs a host and none is
    /// set.
    pub fn build_client(&self) -> Option<ExtractorClient> {
        match self.backend.to_lowercase().as_str() {
            "mock" => Some(ExtractorClient::mock()),
            _ => {
                let host = self.host.as_deref()?;
                let client = match self.api_key.as_deref() {
                    Some(key) => ExtractorClient::OpenAICompatible(
                        crate::extract::OpenAICompatibleExtractor::with_api_key(
                            host,
                            &self.model,
                            key,
                        ),
                    ),
                    None => ExtractorClient::openai_compatible(host, &self.model),
                };
                Some(client)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ExtractorSettings::default();
        assert_eq!(settings.backend, "openai_compatible");
        assert_eq!(settings.model, "gpt-4o-mini");
        assert!(settings.host.is_none());
    }

    #[test]
    fn test_toml_parses_partial_files() {
        let settings: ExtractorSettings =
            toml::from_str("host = \"http://localhost:8000\"").unwrap();
        assert_eq!(settings.host.as_deref(), Some("http://localhost:8000"));
        assert_eq!(settings.model, "gpt-4o-mini");
    }

    #[test]
    fn test_build_client_requires_host() {
        let settings = ExtractorSettings::default();
        assert!(settings.build_client().is_none());

        let settings = ExtractorSettings {
            backend: "mock".to_string(),
            ..Default::default()
        };
        assert!(settings.build_client().is_some());
    }
}
