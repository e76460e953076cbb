//! CLI command definitions

use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use eyre::{Context, Result};
use tracing::debug;

use crate::validation::Shape;

/// DraftLoop - writer/reviewer refinement loop
#[derive(Parser)]
#[command(
    name = "dl",
    about = "Iteratively refine drafts with a writer model and a reviewer model",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the writer/reviewer loop
    Run(RunArgs),

    /// Print the response schema sent to a role
    Schema {
        /// Which role's schema to print
        #[arg(value_enum)]
        role: RoleArg,

        /// Draft count the schema describes
        #[arg(short, long, default_value = "2")]
        drafts: u8,
    },

    /// Validate a captured model reply offline
    Validate {
        /// Which role produced the reply
        #[arg(value_enum)]
        role: RoleArg,

        /// Draft count the reply must agree with
        #[arg(short, long)]
        drafts: u8,

        /// File holding the raw reply text
        file: PathBuf,
    },
}

/// Arguments for `dl run`
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Writing brief, or @path to read it from a file
    #[arg(short, long)]
    pub brief: String,

    /// Review criteria, or @path to read them from a file
    #[arg(short = 'r', long)]
    pub criteria: String,

    /// Background material files (text, images, PDFs)
    #[arg(short = 'B', long = "background", value_name = "FILE")]
    pub background: Vec<PathBuf>,

    /// Background material as pasted text
    #[arg(short, long, value_name = "TEXT")]
    pub paste: Vec<String>,

    /// Model to use (overrides the config file)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Rounds required before the run may converge
    #[arg(long)]
    pub min_iterations: Option<u32>,

    /// Automatic round limit
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Selected-draft score that counts as converged (0-100)
    #[arg(short, long)]
    pub target_score: Option<u8>,

    /// Drafts per round (1-3)
    #[arg(short, long)]
    pub drafts: Option<u8>,

    /// Write the final selected draft to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the iteration history as JSON to this file
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Do not prompt when the run pauses
    #[arg(long)]
    pub no_interactive: bool,
}

/// Role selector for schema/validate commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Writer,
    Reviewer,
}

impl RoleArg {
    pub fn shape(self, draft_count: u8) -> Shape {
        match self {
            RoleArg::Writer => Shape::Writer { draft_count },
            RoleArg::Reviewer => Shape::Reviewer { draft_count },
        }
    }
}

/// Resolve a text argument: `@path` reads the file, anything else is literal
pub fn resolve_text(arg: &str) -> Result<String> {
    debug!(len = arg.len(), "resolve_text: called");
    match arg.strip_prefix('@') {
        Some(path) if !path.is_empty() => {
            debug!(%path, "resolve_text: reading file");
            fs::read_to_string(path).context(format!("Failed to read {}", path))
        }
        _ => Ok(arg.to_string()),
    }
}

/// Path of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("draftloop")
        .join("logs")
        .join("draftloop.log")
}
