//! Core building blocks for Permit Pal.
//!
//! Configuration, the error taxonomy, the retry policy and the bounded
//! worker pool. Nothing in here knows about regulations or LLMs.

mod config;
mod error;
mod parallel;
mod retry;

pub use config::{AiConfig, Config, OllamaConfig, RagConfig, VerdictPolicy, WorkflowConfig};
pub use error::{TaskFailure, WorkflowError, WorkflowResult};
pub use parallel::{PoolConfig, TaskOutcome, WorkerPool};
pub use retry::{retry_async, with_retry, RetryPolicy, RetryResult};
