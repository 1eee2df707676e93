//! The relevance workflow.
//!
//! Enumerates documents, classifies each one through a bounded worker pool
//! and waits on the aggregator barrier for the final [`Partition`].

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;
use uuid::Uuid;

use super::aggregate::{Partition, ResultAggregator, SubmitOutcome};
use super::task::{DirectorySource, Task, TaskResult, TaskSource};
use crate::core::{
    TaskFailure, TaskOutcome, WorkerPool, WorkflowConfig, WorkflowError, WorkflowResult,
};

/// Decides whether a single document is relevant to a prompt.
#[async_trait]
pub trait RelevanceClassifier: Send + Sync {
    /// Classify one task. The verdict is returned verbatim.
    async fn classify(&self, prompt: &str, task: &Task) -> anyhow::Result<TaskResult>;
}

/// Fan-out / fan-in relevance check over a set of documents.
pub struct RelevanceWorkflow {
    source: Arc<dyn TaskSource>,
    classifier: Arc<dyn RelevanceClassifier>,
}

impl RelevanceWorkflow {
    /// Create a workflow over the files of a directory.
    pub fn new(classifier: Arc<dyn RelevanceClassifier>) -> Self {
        Self { source: Arc::new(DirectorySource), classifier }
    }

    /// Use a different task source.
    #[must_use]
    pub fn with_source(mut self, source: impl TaskSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Classify every document at `location` against `prompt`.
    ///
    /// Fails if enumeration fails, if any document exhausts its retries, or
    /// if the configured time budget runs out. No partial partition is ever
    /// returned.
    pub async fn run(
        &self,
        prompt: &str,
        location: &Path,
        config: &WorkflowConfig,
    ) -> WorkflowResult<Partition> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("relevance_run", %run_id);
        self.run_inner(prompt, location, config).instrument(span).await
    }

    async fn run_inner(
        &self,
        prompt: &str,
        location: &Path,
        config: &WorkflowConfig,
    ) -> WorkflowResult<Partition> {
        let start = Instant::now();
        let tasks = self.source.enumerate(location)?;
        tracing::info!(location = %location.display(), tasks = tasks.len(), "Starting relevance workflow");

        let aggregator = ResultAggregator::new(config.verdict_policy);
        if let SubmitOutcome::Complete(partition) = aggregator.record(tasks.len())? {
            tracing::info!("No documents to check");
            return Ok(partition);
        }

        let classifier = Arc::clone(&self.classifier);
        let prompt: Arc<str> = Arc::from(prompt);
        let mut pool = WorkerPool::spawn(config.pool_config(), move |task: Task| {
            let classifier = Arc::clone(&classifier);
            let prompt = Arc::clone(&prompt);
            async move {
                tracing::info!(file = %task, "Starting relevance check");
                let started = Instant::now();
                let result = classifier.classify(&prompt, &task).await?;
                tracing::info!(
                    file = %task,
                    verdict = %result.verdict,
                    elapsed = ?started.elapsed(),
                    "Finished relevance check"
                );
                Ok::<_, anyhow::Error>(result)
            }
        });

        dispatch_all(&mut pool, tasks)?;
        pool.close();

        let collected = collect(&mut pool, &aggregator, config.fail_fast);
        let within_budget = match config.timeout() {
            Some(budget) => tokio::time::timeout(budget, collected).await.map_err(|_| budget),
            None => Ok(collected.await),
        };
        let result = match within_budget {
            Ok(result) => result,
            Err(budget) => {
                tracing::error!(budget = ?budget, in_flight = pool.in_flight(), "Relevance run timed out");
                Err(WorkflowError::Timeout(budget))
            }
        };
        // Whatever is still running is no longer wanted.
        pool.shutdown();

        let partition = result?;
        tracing::info!(
            relevant = ?partition.relevant,
            non_relevant = ?partition.non_relevant,
            elapsed = ?start.elapsed(),
            "Relevance workflow finished"
        );
        Ok(partition)
    }
}

fn dispatch_all(pool: &mut WorkerPool<Task, TaskResult>, tasks: Vec<Task>) -> WorkflowResult<()> {
    for task in tasks {
        pool.dispatch(task).map_err(|e| WorkflowError::Dispatch(format!("{e:#}")))?;
    }
    Ok(())
}

async fn collect(
    pool: &mut WorkerPool<Task, TaskResult>,
    aggregator: &ResultAggregator,
    fail_fast: bool,
) -> WorkflowResult<Partition> {
    let mut failures = Vec::new();

    while let Some(outcome) = pool.next_outcome().await {
        match outcome {
            TaskOutcome::Completed { output, .. } => {
                if !failures.is_empty() {
                    continue;
                }
                match aggregator.submit(output)? {
                    SubmitOutcome::Complete(partition) => return Ok(partition),
                    SubmitOutcome::Waiting { collected, expected } => {
                        tracing::debug!(collected, expected, "Waiting for results");
                    }
                }
            }
            TaskOutcome::Failed { task, attempts, error } => {
                failures.push(TaskFailure {
                    target: task.target().to_string(),
                    attempts,
                    error: format!("{error:#}"),
                });
                if fail_fast {
                    break;
                }
            }
        }
    }

    if failures.is_empty() {
        return Err(WorkflowError::AggregationInvariant(format!(
            "worker pool stopped after {} of {} results",
            aggregator.collected(),
            aggregator.expected().unwrap_or_default()
        )));
    }
    Err(WorkflowError::Classification { failures })
}
