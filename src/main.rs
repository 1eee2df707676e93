//! Permit Pal - permits and paperwork for what you want to do, where you want to do it.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use permitpal::ai::{provider_name_for, LlmRelevanceClassifier, KNOWN_MODELS};
use permitpal::{Config, Partition, RelevanceWorkflow, ReportGenerator, ReportOptions};

/// Find the permits and paperwork an action needs
#[derive(Parser)]
#[command(name = "permitpal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check which documents are relevant to a prompt
    Check {
        /// Action and location, e.g. "open a restaurant in Atlanta, Georgia"
        prompt: String,

        /// Directory of documents to check
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Maximum number of documents checked at once
        #[arg(short, long)]
        workers: Option<usize>,

        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Generate the permit report for a prompt
    Report {
        /// Action and location, e.g. "open a restaurant in Atlanta, Georgia"
        prompt: String,

        /// Model that writes the report
        #[arg(short, long)]
        model: Option<String>,

        /// Add context from the relevant documents
        #[arg(long)]
        rag: bool,

        /// Directory of documents used for context
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Write the report to this file (or into this directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List known models
    Models,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Write the current settings to the global config file
        #[arg(long, conflicts_with = "path")]
        init: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so reports can be piped
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Check { prompt, data_dir, workers, timeout, format } => {
            cmd_check(&prompt, data_dir, workers, timeout, format)?;
        }
        Commands::Report { prompt, model, rag, data_dir, output } => {
            cmd_report(&prompt, model, rag, data_dir, output.as_deref())?;
        }
        Commands::Models => {
            cmd_models();
        }
        Commands::Config { path, init } => {
            cmd_config(path, init)?;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}

/// Run the relevance workflow and print the partition.
fn cmd_check(
    prompt: &str,
    data_dir: Option<PathBuf>,
    workers: Option<usize>,
    timeout: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = data_dir {
        config.workflow.data_dir = dir;
    }
    if let Some(workers) = workers {
        config.workflow.workers = workers;
    }
    if timeout.is_some() {
        config.workflow.timeout_secs = timeout;
    }

    let classifier = LlmRelevanceClassifier::from_config(&config.ai)?;
    let workflow = RelevanceWorkflow::new(Arc::new(classifier));
    let data_dir = config.workflow.resolved_data_dir();

    // Create tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;
    let partition = rt.block_on(workflow.run(prompt, &data_dir, &config.workflow))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&partition)?),
        OutputFormat::Text => print_partition(&partition),
    }
    Ok(())
}

fn print_partition(partition: &Partition) {
    println!("Relevant:");
    for target in &partition.relevant {
        println!("  {target}");
    }
    println!("Not relevant:");
    for target in &partition.non_relevant {
        println!("  {target}");
    }
    if !partition.unrecognized.is_empty() {
        println!("Unrecognized:");
        for target in &partition.unrecognized {
            println!("  {target}");
        }
    }
}

/// Generate a report and print or save it.
fn cmd_report(
    prompt: &str,
    model: Option<String>,
    rag: bool,
    data_dir: Option<PathBuf>,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = data_dir {
        config.workflow.data_dir = dir;
    }

    let mut options = ReportOptions::from_config(&config);
    if let Some(model) = model {
        options.model = model;
    }
    options.rag_enabled |= rag;

    let generator = ReportGenerator::new(config);
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(generator.create_report(prompt, &options))?;

    match output {
        Some(path) => {
            let path = report_path(path);
            std::fs::write(&path, &report)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{report}"),
    }
    Ok(())
}

/// Name a timestamped file when the output is a directory.
fn report_path(output: &Path) -> PathBuf {
    if output.is_dir() {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        output.join(format!("permit-report-{stamp}.md"))
    } else {
        output.to_path_buf()
    }
}

fn cmd_models() {
    for model in KNOWN_MODELS {
        println!("{model:<24} {}", provider_name_for(model));
    }
}

/// Show configuration.
fn cmd_config(show_path: bool, init: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::global_config_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    if init {
        let path = Config::global_config_path().context("Could not determine config directory")?;
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        config.save()?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "permitpal", &mut io::stdout());
}
