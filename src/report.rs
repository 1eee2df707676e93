//! Permit report generation.

use std::sync::Arc;
use std::time::Instant;

use crate::ai::prompts::report_prompt;
use crate::ai::{provider_for_model, CompletionRequest, LlmProvider, LlmRelevanceClassifier};
use crate::core::Config;
use crate::rag::{add_context, LlmContextSynthesizer, NO_CONTEXT};
use crate::workflow::RelevanceWorkflow;

/// Per-report choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Model that writes the report.
    pub model: String,
    /// Whether to pull extra context from the document corpus first.
    pub rag_enabled: bool,
}

impl ReportOptions {
    /// Options taken from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self { model: config.ai.report_model.clone(), rag_enabled: config.rag.enabled }
    }
}

/// Produces the Markdown table of permits needed for an action.
pub struct ReportGenerator {
    config: Config,
}

impl ReportGenerator {
    /// Create a generator.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Generate a report for `prompt`.
    pub async fn create_report(&self, prompt: &str, options: &ReportOptions) -> anyhow::Result<String> {
        let context = if options.rag_enabled {
            let classifier = LlmRelevanceClassifier::from_config(&self.config.ai)?;
            let workflow = RelevanceWorkflow::new(Arc::new(classifier));
            let synthesizer = LlmContextSynthesizer::from_config(&self.config)?;
            add_context(prompt, &workflow, &synthesizer, &self.config).await?
        } else {
            NO_CONTEXT.to_string()
        };

        let provider = provider_for_model(&options.model, &self.config.ai)?;
        generate(provider.as_ref(), prompt, &context).await
    }
}

/// Output budget for a report. The provider defaults are sized for one-word
/// relevance replies.
pub const REPORT_MAX_TOKENS: u32 = 8192;

/// Ask `provider` for the report table with the given context.
pub async fn generate(provider: &dyn LlmProvider, prompt: &str, context: &str) -> anyhow::Result<String> {
    let request = CompletionRequest::new(prompt)
        .with_system(report_prompt(context))
        .with_temperature(0.0)
        .with_max_tokens(REPORT_MAX_TOKENS);

    tracing::info!(model = provider.model(), "Starting report generation");
    let start = Instant::now();
    let table = provider.complete(&request).await?;
    tracing::info!(model = provider.model(), elapsed = ?start.elapsed(), "Report generated");

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct TableProvider {
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmProvider for TableProvider {
        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
            self.requests.lock().push(request.clone());
            Ok("Document/Permit | Agency\nFood Service Permit | Fulton County".to_string())
        }

        fn name(&self) -> &str {
            "table"
        }

        fn model(&self) -> &str {
            "table-1"
        }
    }

    #[tokio::test]
    async fn test_generate_sends_system_prompt_at_zero_temperature() {
        let provider = TableProvider::default();

        let table = generate(&provider, "I want to open a restaurant in Atlanta, Georgia.", "Grease traps required.")
            .await
            .unwrap();

        assert!(table.starts_with("Document/Permit"));
        let requests = provider.requests.lock();
        assert_eq!(requests[0].prompt, "I want to open a restaurant in Atlanta, Georgia.");
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(requests[0].max_tokens, Some(REPORT_MAX_TOKENS));
        let system = requests[0].system.as_deref().unwrap();
        assert!(system.contains("CONTEXT:\nGrease traps required."));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.rag.enabled = true;
        config.ai.report_model = "gemini-2.5-pro".to_string();

        let options = ReportOptions::from_config(&config);
        assert_eq!(options, ReportOptions { model: "gemini-2.5-pro".to_string(), rag_enabled: true });
    }

    #[tokio::test]
    async fn test_local_model_without_server_fails() {
        let mut config = Config::default();
        config.ai.ollama.base_url = "http://127.0.0.1:9".to_string();
        config.ai.ollama.request_timeout_secs = 2;
        let generator = ReportGenerator::new(config);
        let options = ReportOptions { model: "phi4-mini".to_string(), rag_enabled: false };

        assert!(generator.create_report("open a bakery", &options).await.is_err());
    }
}
