//! Relevance-checking workflow.
//!
//! ```text
//! TaskSource ──enumerate──▶ WorkerPool (≤ W in flight, retried)
//!                                │ one outcome per task
//!                                ▼
//!                        ResultAggregator ──barrier──▶ Partition
//! ```

mod aggregate;
mod relevance;
mod task;

pub use aggregate::{
    Partition, ResultAggregator, SubmitOutcome, Verdict, NO_NON_RELEVANT_RESULTS,
    NO_RELEVANT_RESULTS,
};
pub use relevance::{RelevanceClassifier, RelevanceWorkflow};
pub use task::{DirectorySource, StaticSource, Task, TaskResult, TaskSource};
