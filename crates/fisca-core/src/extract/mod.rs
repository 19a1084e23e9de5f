//! Pluggable document extraction backends
//!
//! The AI step that turns a raw document into structured fields is an
//! external service with a fixed contract. This module provides a
//! backend-agnostic interface for it.
//!
//! # Architecture
//!
//! - `ExtractionBackend` trait: defines the extraction interface
//! - `ExtractorClient` enum: concrete wrapper providing Clone + compile-time
//!   dispatch
//! - Backend implementations: `OpenAICompatibleExtractor`, `MockExtractor`
//!
//! # Configuration
//!
//! Environment variables:
//! - `EXTRACTOR_BACKEND`: Backend to use (openai_compatible, mock).
//!   Default: openai_compatible
//! - `EXTRACTOR_HOST`: Server URL (required for openai_compatible)
//! - `EXTRACTOR_MODEL`: Model name (default: gpt-4o-mini)
//! - `EXTRACTOR_API_KEY`: API key if required (optional)

mod mock;
mod openai_compatible;
pub mod parsing;
pub mod payload;
pub mod types;

pub use mock::MockExtractor;
pub use openai_compatible::OpenAICompatibleExtractor;
pub use payload::{prepare_payload, DocumentPayload, MAX_SHEET_LINES};
pub use types::{ExtractedBudgetLine, ExtractedItem};

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::models::SourceKind;

/// Trait defining the interface for extraction backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Extract the logical items from one document payload
    ///
    /// A budget document may yield many items; a proposal yields exactly one.
    async fn extract_items(
        &self,
        file_name: &str,
        payload: &DocumentPayload,
        kind: SourceKind,
    ) -> Result<Vec<ExtractedItem>>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete extractor client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ExtractorClient {
    /// Any server implementing the OpenAI chat completions API
    OpenAICompatible(OpenAICompatibleExtractor),
    /// Mock backend for testing and offline development
    Mock(MockExtractor),
}

impl ExtractorClient {
    /// Create an extractor client from environment variables
    ///
    /// Checks `EXTRACTOR_BACKEND` to determine which backend to use:
    /// - `openai_compatible` (default): uses EXTRACTOR_HOST and
    ///   EXTRACTOR_MODEL
    /// - `mock`: creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend =
            std::env::var("EXTRACTOR_BACKEND").unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" | "vllm" | "localai" => {
                OpenAICompatibleExtractor::from_env().map(ExtractorClient::OpenAICompatible)
            }
            "mock" => Some(ExtractorClient::Mock(MockExtractor::new())),
            _ => {
                warn!(backend = %backend, "Unknown EXTRACTOR_BACKEND, falling back to openai_compatible");
                OpenAICompatibleExtractor::from_env().map(ExtractorClient::OpenAICompatible)
            }
        }
    }

    /// Create an OpenAI-compatible backend directly
    pub fn openai_compatible(host: &str, model: &str) -> Self {
        ExtractorClient::OpenAICompatible(OpenAICompatibleExtractor::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        ExtractorClient::Mock(MockExtractor::new())
    }
}

#[async_trait]
impl ExtractionBackend for ExtractorClient {
    async fn extract_items(
        &self,
        file_name: &str,
        payload: &DocumentPayload,
        kind: SourceKind,
    ) -> Result<Vec<ExtractedItem>> {
        match self {
            ExtractorClient::OpenAICompatible(b) => b.extract_items(file_name, payload, kind).await,
            ExtractorClient::Mock(b) => b.extract_items(file_name, payload, kind).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ExtractorClient::OpenAICompatible(b) => b.health_check().await,
            ExtractorClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ExtractorClient::OpenAICompatible(b) => b.model(),
            ExtractorClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ExtractorClient::OpenAICompatible(b) => b.host(),
            ExtractorClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractor_client_mock() {
        let client = ExtractorClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = ExtractorClient::mock();
        assert!(client.health_check().await);
    }
}
