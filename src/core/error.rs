//! Workflow error types.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// A task that exhausted its retry attempts.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    /// The target the task was operating on.
    pub target: String,
    /// Number of attempts made before giving up.
    pub attempts: u32,
    /// Message of the last error.
    pub error: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} attempts): {}", self.target, self.attempts, self.error)
    }
}

/// Errors that end a relevance run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The task source location could not be listed.
    #[error("Failed to enumerate tasks in {}: {source}", .path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One or more tasks failed after exhausting their retries.
    #[error("Classification failed for {} task(s): {}", .failures.len(), format_failures(.failures))]
    Classification { failures: Vec<TaskFailure> },

    /// The aggregator was driven in a way that breaks its counting contract.
    #[error("Aggregation invariant violated: {0}")]
    AggregationInvariant(String),

    /// The worker pool refused a task before it could run.
    #[error("Worker pool rejected task: {0}")]
    Dispatch(String),

    /// A verdict was neither "Yes" nor "No" and the policy treats that as fatal.
    #[error("Unrecognized verdict for {target}: {verdict:?}")]
    UnrecognizedVerdict { target: String, verdict: String },

    /// The run exceeded its wall-clock budget.
    #[error("Relevance run timed out after {0:?}")]
    Timeout(Duration),
}

impl WorkflowError {
    /// Targets of the tasks that failed, if this is a classification error.
    pub fn failed_targets(&self) -> Vec<&str> {
        match self {
            Self::Classification { failures } => {
                failures.iter().map(|f| f.target.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn format_failures(failures: &[TaskFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_error_lists_every_target() {
        let err = WorkflowError::Classification {
            failures: vec![
                TaskFailure {
                    target: "data/a.pdf".to_string(),
                    attempts: 3,
                    error: "timeout".to_string(),
                },
                TaskFailure {
                    target: "data/b.pdf".to_string(),
                    attempts: 3,
                    error: "503".to_string(),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("2 task(s)"));
        assert!(message.contains("data/a.pdf (after 3 attempts): timeout"));
        assert!(message.contains("data/b.pdf"));
        assert_eq!(err.failed_targets(), vec!["data/a.pdf", "data/b.pdf"]);
    }

    #[test]
    fn test_dispatch_error_names_the_pool() {
        let err = WorkflowError::Dispatch("worker pool is closed".to_string());

        assert_eq!(err.to_string(), "Worker pool rejected task: worker pool is closed");
        assert!(!err.to_string().contains("invariant"));
        assert!(err.failed_targets().is_empty());
    }

    #[test]
    fn test_enumeration_error_keeps_source() {
        let err = WorkflowError::Enumeration {
            path: PathBuf::from("missing/"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        };

        assert!(err.to_string().contains("missing/"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.failed_targets().is_empty());
    }
}
