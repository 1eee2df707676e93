//! Ollama local LLM integration.
//!
//! Ollama cannot read PDFs, so only text attachments are accepted. They are
//! inlined ahead of the prompt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{AIError, CompletionRequest, LlmProvider};
use crate::core::OllamaConfig;

/// Ollama API provider for local LLM.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    context_window: u32,
}

impl OllamaProvider {
    /// Create a provider from configuration.
    pub fn from_config(config: &OllamaConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: "phi4-mini".to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            context_window: config.context_window,
        }
    }

    /// Create with a specific model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> Result<OllamaRequest, AIError> {
        let mut prompt = String::new();
        for attachment in &request.attachments {
            if !attachment.is_text() {
                return Err(AIError::UnsupportedAttachment {
                    provider: "ollama".to_string(),
                    mime_type: attachment.mime_type.clone(),
                });
            }
            prompt.push_str(&format!(
                "--- {} ---\n{}\n\n",
                attachment.name,
                String::from_utf8_lossy(&attachment.data)
            ));
        }
        prompt.push_str(&request.prompt);

        Ok(OllamaRequest {
            model: self.model.clone(),
            prompt,
            system: request.system.clone(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature.unwrap_or(self.temperature),
                num_predict: request.max_tokens.unwrap_or(self.max_tokens),
                num_ctx: self.context_window,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let body = self.build_request(request)?;

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AIError::ApiError { provider: "ollama".to_string(), status, body }.into());
        }

        let response: OllamaResponse = response.json().await?;
        Ok(response.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama API request structure.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
    num_ctx: u32,
}

/// Ollama API response structure.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Attachment;

    #[test]
    fn test_ollama_provider_from_config() {
        let config = OllamaConfig { base_url: "http://custom:8080/".to_string(), ..Default::default() };
        let provider = OllamaProvider::from_config(&config);
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.base_url, "http://custom:8080");
        assert_eq!(provider.context_window, 8000);
    }

    #[test]
    fn test_ollama_with_custom_model() {
        let provider = OllamaProvider::from_config(&OllamaConfig::default()).with_model("llama3.2:3b");
        assert_eq!(provider.model(), "llama3.2:3b");
    }

    #[test]
    fn test_request_uses_configured_options() {
        let provider = OllamaProvider::from_config(&OllamaConfig::default());
        let request = CompletionRequest::new("Is this relevant?").with_system("rules");

        let body = provider.build_request(&request).unwrap();
        assert_eq!(body.system.as_deref(), Some("rules"));
        assert!(!body.stream);
        assert!((body.options.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(body.options.num_predict, 200);

        let overridden = provider.build_request(&request.with_temperature(0.0)).unwrap();
        assert_eq!(overridden.options.temperature, 0.0);
    }

    #[test]
    fn test_report_budget_replaces_reply_cap() {
        let provider = OllamaProvider::from_config(&OllamaConfig::default());
        let request = CompletionRequest::new("open a bakery")
            .with_max_tokens(crate::report::REPORT_MAX_TOKENS);

        let body = provider.build_request(&request).unwrap();
        assert_eq!(body.options.num_predict, 8192);
    }

    #[test]
    fn test_text_attachments_are_inlined() {
        let provider = OllamaProvider::from_config(&OllamaConfig::default());
        let request = CompletionRequest::new("Summarize")
            .with_attachment(Attachment::new("rules.txt", "text/plain", b"No food trucks".to_vec()));

        let body = provider.build_request(&request).unwrap();
        assert!(body.prompt.starts_with("--- rules.txt ---\nNo food trucks"));
        assert!(body.prompt.ends_with("Summarize"));
    }

    #[test]
    fn test_pdf_attachments_are_rejected() {
        let provider = OllamaProvider::from_config(&OllamaConfig::default());
        let request = CompletionRequest::new("Summarize")
            .with_attachment(Attachment::new("rules.pdf", "application/pdf", vec![0x25]));

        let err = provider.build_request(&request).unwrap_err();
        assert!(matches!(err, AIError::UnsupportedAttachment { .. }));
    }
}
