//! OpenAI-compatible extraction backend
//!
//! Works with any server that implements the OpenAI chat completions API:
//! hosted gateways, vLLM, LocalAI, llama-server, and the like. Spreadsheets
//! travel as inline text; PDFs travel as a base64 file content part.
//!
//! # Configuration
//!
//! Environment variables:
//! - `EXTRACTOR_HOST`: Server URL (required)
//! - `EXTRACTOR_MODEL`: Model name (default: gpt-4o-mini)
//! - `EXTRACTOR_API_KEY`: API key if required (optional)

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::SourceKind;
use crate::prompts::{PromptId, PromptLibrary};

use super::parsing::parse_extraction_response;
use super::types::ExtractedItem;
use super::{DocumentPayload, ExtractionBackend};

/// Extraction calls get a generous timeout: large PDFs take a while
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct OpenAICompatibleExtractor {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl Clone for OpenAICompatibleExtractor {
    fn clone(&self) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            prompts: self.prompts.clone(),
        }
    }
}

impl OpenAICompatibleExtractor {
    /// Create a new OpenAI-compatible extraction backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("EXTRACTOR_HOST").ok()?;
        let model =
            std::env::var("EXTRACTOR_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let api_key = std::env::var("EXTRACTOR_API_KEY").ok();

        let mut backend = Self::new(&host, &model);
        backend.api_key = api_key;
        Some(backend)
    }

    fn prompt_for(&self, kind: SourceKind, document: &str) -> Result<String> {
        let id = match kind {
            SourceKind::ProjectDocument => PromptId::ExtractProposal,
            SourceKind::BudgetDocument => PromptId::ExtractBudgetSheet,
        };
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(id)?;
        let mut vars = HashMap::new();
        vars.insert("document", document);
        Ok(template.render(&vars))
    }

    /// Make a chat completion request
    async fn chat_completion(&self, content: Vec<ChatContentPart>) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            temperature: Some(0.0),
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "Extraction API error {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Extraction("Extraction API returned no choices".into()))?;

        debug!(chars = text.len(), "extraction response received");
        Ok(text)
    }
}

/// Request to the chat completions API
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ChatContentPart>,
}

/// A content part of a chat message: inline text or an attached file
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatContentPart {
    Text { text: String },
    File { file: FilePart },
}

#[derive(Debug, Serialize)]
struct FilePart {
    filename: String,
    /// Data URL: `data:<mime>;base64,<payload>`
    file_data: String,
}

/// Response from the chat completions API
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl ExtractionBackend for OpenAICompatibleExtractor {
    async fn extract_items(
        &self,
        file_name: &str,
        payload: &DocumentPayload,
        kind: SourceKind,
    ) -> Result<Vec<ExtractedItem>> {
        let content = match payload {
            DocumentPayload::Text(text) => {
                let prompt = self.prompt_for(kind, text)?;
                vec![ChatContentPart::Text { text: prompt }]
            }
            DocumentPayload::Binary { mime, base64 } => {
                // the prompt's document slot stays empty; the file rides
                // alongside as its own content part
                let prompt = self.prompt_for(kind, "(attached)")?;
                vec![
                    ChatContentPart::Text { text: prompt },
                    ChatContentPart::File {
                        file: FilePart {
                            filename: file_name.to_string(),
                            file_data: format!("data:{};base64,{}", mime, base64),
                        },
                    },
                ]
            }
        };

        let response = self.chat_completion(content).await?;
        parse_extraction_response(&response)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        let mut req = self
            .http_client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5));
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        matches!(req.send().await, Ok(resp) if resp.status().is_success())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
