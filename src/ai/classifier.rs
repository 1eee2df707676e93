//! Model-backed relevance classification.

use std::sync::Arc;

use async_trait::async_trait;

use super::prompts::relevance_prompt;
use super::{provider_for_model, Attachment, CompletionRequest, LlmProvider};
use crate::core::AiConfig;
use crate::workflow::{RelevanceClassifier, Task, TaskResult};

/// Asks a model whether one document is relevant to a prompt.
///
/// The document is attached ahead of the relevance instructions. The reply
/// is trimmed and otherwise passed through untouched.
pub struct LlmRelevanceClassifier {
    provider: Arc<dyn LlmProvider>,
}

impl LlmRelevanceClassifier {
    /// Classify with the given provider.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Classify with the configured relevance model.
    pub fn from_config(config: &AiConfig) -> anyhow::Result<Self> {
        Ok(Self::new(provider_for_model(&config.relevance_model, config)?))
    }
}

#[async_trait]
impl RelevanceClassifier for LlmRelevanceClassifier {
    async fn classify(&self, prompt: &str, task: &Task) -> anyhow::Result<TaskResult> {
        let mut document = Attachment::read(task.path()).await?;
        if document.mime_type == "application/octet-stream" {
            document.mime_type = "application/pdf".to_string();
        }

        let request = CompletionRequest::new(relevance_prompt(prompt)).with_attachment(document);
        let reply = self.provider.complete(&request).await?;
        tracing::debug!(file = %task, model = self.provider.model(), reply = %reply, "Model replied");

        Ok(TaskResult::new(task.target(), reply.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct EchoProvider {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
            self.seen.lock().push(request.clone());
            Ok(self.reply.clone())
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    #[tokio::test]
    async fn test_classify_attaches_document_and_trims_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fulton-food.pdf");
        std::fs::write(&path, b"%PDF-1.7 food service").unwrap();

        let provider = Arc::new(EchoProvider { reply: " Yes\n".to_string(), seen: Mutex::new(Vec::new()) });
        let classifier = LlmRelevanceClassifier::new(provider.clone());
        let task = Task::new(path.display().to_string());

        let result = classifier.classify("open a restaurant in Atlanta", &task).await.unwrap();
        assert_eq!(result.verdict, "Yes");
        assert_eq!(result.target, task.target());

        let seen = provider.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].attachments[0].mime_type, "application/pdf");
        assert_eq!(seen[0].attachments[0].data, b"%PDF-1.7 food service");
        assert!(seen[0].prompt.contains("open a restaurant in Atlanta"));
    }

    #[tokio::test]
    async fn test_unknown_extension_is_sent_as_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permit");
        std::fs::write(&path, b"%PDF").unwrap();

        let provider = Arc::new(EchoProvider { reply: "No".to_string(), seen: Mutex::new(Vec::new()) });
        let classifier = LlmRelevanceClassifier::new(provider.clone());

        let result = classifier.classify("x", &Task::new(path.display().to_string())).await.unwrap();
        assert_eq!(result.verdict, "No");
        assert_eq!(provider.seen.lock()[0].attachments[0].mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_unreadable_file_is_error() {
        let provider = Arc::new(EchoProvider { reply: "Yes".to_string(), seen: Mutex::new(Vec::new()) });
        let classifier = LlmRelevanceClassifier::new(provider.clone());

        assert!(classifier.classify("x", &Task::new("/definitely/missing.pdf")).await.is_err());
        assert!(provider.seen.lock().is_empty());
    }
}
