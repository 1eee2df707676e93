//! LLM integration.
//!
//! Every model call in Permit Pal goes through [`LlmProvider`]. Gemini models
//! are reached over the Generative Language REST API and can read PDF
//! attachments; everything else is assumed to be served by a local Ollama.

mod classifier;
mod gemini;
mod ollama;
pub mod prompts;

pub use classifier::LlmRelevanceClassifier;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AiConfig;

/// Models Permit Pal knows how to route.
pub const KNOWN_MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-3-pro-preview",
    "gemini-3-flash-preview",
    "phi4-mini",
    "qwen2.5:3b-instruct",
    "deepseek-r1:1.5b",
    "llama3.2:3b",
];

/// A binary document sent alongside a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Display name, usually the file path.
    pub name: String,
    /// MIME type of `data`.
    pub mime_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create an attachment from raw bytes.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), data }
    }

    /// Read a file, guessing its MIME type from the extension.
    pub async fn read(path: &Path) -> anyhow::Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        Ok(Self::new(path.display().to_string(), mime_type_for(path), data))
    }

    /// Whether the attachment is plain text that can be inlined into a prompt.
    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html" | "htm") => "text/html",
        _ => "application/octet-stream",
    }
}

/// One model request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// System instructions, if any.
    pub system: Option<String>,
    /// The user prompt.
    pub prompt: String,
    /// Documents sent before the prompt.
    pub attachments: Vec<Attachment>,
    /// Sampling temperature (provider default when unset).
    pub temperature: Option<f32>,
    /// Output token cap (provider default when unset).
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a request with just a user prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), ..Default::default() }
    }

    /// Set the system instructions.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach a document.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the number of output tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion and return the model's text.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;

    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the model this provider talks to.
    fn model(&self) -> &str;
}

/// AI error types.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("{0} not set")]
    MissingCredentials(String),

    #[error("{provider} API error ({status}): {body}")]
    ApiError { provider: String, status: u16, body: String },

    #[error("No response from {0}")]
    NoResponse(String),

    #[error("{provider} cannot read {mime_type} attachments")]
    UnsupportedAttachment { provider: String, mime_type: String },
}

/// Name of the provider that serves `model`.
pub fn provider_name_for(model: &str) -> &'static str {
    if model.starts_with("gemini") {
        "gemini"
    } else {
        "ollama"
    }
}

/// Build the provider that serves `model`.
pub fn provider_for_model(model: &str, config: &AiConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match provider_name_for(model) {
        "gemini" => Arc::new(
            GeminiProvider::from_env()?
                .with_base_url(&config.gemini_base_url)
                .with_model(model),
        ),
        _ => Arc::new(OllamaProvider::from_config(&config.ollama).with_model(model)),
    };
    tracing::debug!(provider = provider.name(), model, "Selected LLM provider");
    Ok(provider)
}
