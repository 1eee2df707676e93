//! Retrieval of extra report context from the document corpus.
//!
//! The relevance workflow picks the documents that matter for a prompt and a
//! [`ContextSynthesizer`] condenses them into a block of text for the report.

mod refine;

pub use refine::LlmContextSynthesizer;

use std::time::Instant;

use async_trait::async_trait;

use crate::core::Config;
use crate::workflow::RelevanceWorkflow;

/// Context used when no document is relevant.
pub const NO_CONTEXT: &str = " ";

/// Condenses a set of documents into context for a prompt.
#[async_trait]
pub trait ContextSynthesizer: Send + Sync {
    /// Produce context for `prompt` from the given document paths, in the
    /// order given.
    async fn synthesize(&self, prompt: &str, documents: &[String]) -> anyhow::Result<String>;
}

/// Find the documents relevant to `prompt` and synthesize context from them.
///
/// Relevant documents are handed to the synthesizer sorted by path, so a
/// document cap always keeps the same ones. Returns [`NO_CONTEXT`] when
/// nothing in the data directory is relevant.
pub async fn add_context(
    prompt: &str,
    workflow: &RelevanceWorkflow,
    synthesizer: &dyn ContextSynthesizer,
    config: &Config,
) -> anyhow::Result<String> {
    let data_dir = config.workflow.resolved_data_dir();

    let start = Instant::now();
    let partition = workflow.run(prompt, &data_dir, &config.workflow).await?;
    tracing::info!(
        relevant = ?partition.relevant,
        non_relevant = ?partition.non_relevant,
        elapsed = ?start.elapsed(),
        "Relevance workflow result"
    );

    if !partition.has_relevant() {
        tracing::info!("No relevant documents, continuing without context");
        return Ok(NO_CONTEXT.to_string());
    }

    // Completion order varies between runs; file order does not.
    let mut documents = partition.relevant_targets().to_vec();
    documents.sort();

    let start = Instant::now();
    let context = synthesizer.synthesize(prompt, &documents).await?;
    tracing::info!(elapsed = ?start.elapsed(), chars = context.len(), "Synthesized context");
    tracing::debug!(context = %context, "Context");
    Ok(context)
}
