//! # Permit Pal
//!
//! Finds the licenses, permits and paperwork needed to do something somewhere.
//!
//! A folder of regulation documents is checked for relevance against the
//! user's prompt by a bounded pool of concurrent model calls. The relevant
//! documents can be condensed into extra context before a model writes the
//! final permit table.
//!
//! ## Quick Start
//!
//! ```bash
//! # Which documents in data/ matter?
//! permitpal check "I want to open a food truck in Atlanta, Georgia."
//!
//! # Full report, using the relevant documents as context
//! permitpal report --rag "I want to open a food truck in Atlanta, Georgia."
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::format_push_string)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]

pub mod ai;
pub mod core;
pub mod rag;
pub mod report;
pub mod workflow;

// Re-export commonly used types
pub use ai::{LlmProvider, LlmRelevanceClassifier};
pub use crate::core::{Config, WorkflowConfig, WorkflowError};
pub use report::{ReportGenerator, ReportOptions};
pub use workflow::{Partition, RelevanceClassifier, RelevanceWorkflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "permitpal";
