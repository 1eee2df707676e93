//! Configuration management for Permit Pal.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::parallel::PoolConfig;
use super::retry::RetryPolicy;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relevance workflow settings
    pub workflow: WorkflowConfig,

    /// Context synthesis settings
    pub rag: RagConfig,

    /// LLM provider settings
    pub ai: AiConfig,
}

/// What to do with a verdict that is neither "Yes" nor "No".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictPolicy {
    /// Count the target as not relevant.
    #[default]
    NonRelevant,
    /// Keep the target in a separate `unrecognized` list.
    Separate,
    /// Fail the run.
    Fail,
}

/// Settings for one relevance run.
///
/// Passed explicitly into every run; nothing here is process-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Directory holding the regulation documents
    pub data_dir: PathBuf,

    /// Maximum number of classifications in flight
    pub workers: usize,

    /// Delay between attempts of a failed classification, in milliseconds
    pub retry_delay_ms: u64,

    /// Total attempts per classification
    pub max_attempts: u32,

    /// Wall-clock budget for a whole run, in seconds (unbounded when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Abort on the first task that exhausts its retries
    pub fail_fast: bool,

    /// Handling of verdicts other than "Yes" and "No"
    pub verdict_policy: VerdictPolicy,
}

impl WorkflowConfig {
    /// Retry policy for each classification.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::constant(Duration::from_millis(self.retry_delay_ms), self.max_attempts)
    }

    /// Worker pool settings.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new().workers(self.workers).retry(self.retry_policy())
    }

    /// Run budget, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The data directory with `~` and environment variables expanded.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }
}

/// Context synthesis (RAG) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Whether reports include synthesized document context
    pub enabled: bool,

    /// Maximum number of relevant documents fed into synthesis
    pub max_documents: usize,

    /// Model used for synthesis
    pub model: String,
}

/// LLM provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Model that answers the per-document relevance question
    pub relevance_model: String,

    /// Model that writes the final report
    pub report_model: String,

    /// Gemini API base URL
    pub gemini_base_url: String,

    /// Ollama-specific settings
    pub ollama: OllamaConfig,
}

/// Ollama configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama server URL
    pub base_url: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Context window size
    pub context_window: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.permitpal.toml` in current directory
    /// 2. `~/.config/permitpal/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".permitpal.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::global_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to_file(&config_path)
    }

    /// Save configuration to a specific file, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("permitpal"))
    }

    /// Path of the global config file.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/"),
            workers: 2,
            retry_delay_ms: 2000,
            max_attempts: 3,
            timeout_secs: None,
            fail_fast: true,
            verdict_policy: VerdictPolicy::default(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { enabled: false, max_documents: 5, model: "gemini-2.5-flash".to_string() }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            relevance_model: "gemini-3-flash-preview".to_string(),
            report_model: "gemini-3-flash-preview".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            temperature: 0.1,
            max_tokens: 200,
            context_window: 8000,
            request_timeout_secs: 600,
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}
