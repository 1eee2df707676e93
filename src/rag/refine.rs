//! Refine-style context synthesis.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::{ContextSynthesizer, NO_CONTEXT};
use crate::ai::prompts::{initial_context_prompt, refine_context_prompt};
use crate::ai::{provider_for_model, Attachment, CompletionRequest, LlmProvider};
use crate::core::Config;

/// Builds an answer from the first document, then refines it with each
/// following document in turn.
pub struct LlmContextSynthesizer {
    provider: Arc<dyn LlmProvider>,
    max_documents: usize,
}

impl LlmContextSynthesizer {
    /// Synthesize with `provider`, reading at most `max_documents` documents.
    pub fn new(provider: Arc<dyn LlmProvider>, max_documents: usize) -> Self {
        Self { provider, max_documents: max_documents.max(1) }
    }

    /// Synthesize with the configured RAG model.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = provider_for_model(&config.rag.model, &config.ai)?;
        Ok(Self::new(provider, config.rag.max_documents))
    }
}

#[async_trait]
impl ContextSynthesizer for LlmContextSynthesizer {
    async fn synthesize(&self, prompt: &str, documents: &[String]) -> anyhow::Result<String> {
        if documents.len() > self.max_documents {
            tracing::info!(
                available = documents.len(),
                used = self.max_documents,
                "Limiting documents used for context"
            );
        }

        let mut answer: Option<String> = None;
        for document in documents.iter().take(self.max_documents) {
            let attachment = Attachment::read(Path::new(document)).await?;
            let instructions = match &answer {
                None => initial_context_prompt(prompt),
                Some(existing) => refine_context_prompt(prompt, existing),
            };
            let request = CompletionRequest::new(instructions).with_attachment(attachment);

            let reply = self.provider.complete(&request).await?;
            tracing::debug!(document = %document, model = self.provider.model(), "Refined context");

            let reply = reply.trim();
            if !reply.is_empty() {
                answer = Some(reply.to_string());
            }
        }

        Ok(answer.unwrap_or_else(|| NO_CONTEXT.to_string()))
    }
}
