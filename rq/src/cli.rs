//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// rq - coalescing request queue
#[derive(Parser)]
#[command(
    name = "rq",
    about = "Coalescing request queue with bounded concurrency, retries and result caching",
    version = env!("CARGO_PKG_VERSION"),
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
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a synthetic workload through a queue and report what happened
    Simulate {
        /// Distinct keys to request
        #[arg(short, long)]
        keys: Option<usize>,

        /// Concurrent subscribers per key
        #[arg(short, long)]
        subscribers: Option<usize>,

        /// Probability that one attempt fails (0.0 - 1.0)
        #[arg(short, long)]
        failure_rate: Option<f64>,

        /// Upper bound of per-attempt latency in milliseconds
        #[arg(long)]
        latency_ms: Option<u64>,

        /// Maximum simultaneously running operations
        #[arg(long)]
        concurrency: Option<usize>,

        /// Retries after the first failed attempt
        #[arg(short, long)]
        retries: Option<u32>,

        /// Run without a result cache even if one is configured
        #[arg(long)]
        no_cache: bool,

        /// Output format (text, yaml, json)
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config {
        /// Output format (yaml, json)
        #[arg(long, default_value = "yaml")]
        format: OutputFormat,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("requestqueue")
        .join("logs")
        .join("rq.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    format!("Logs are written to: {}\n", get_log_path().display())
}

/// Output format for reports and configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Yaml,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text, yaml, or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}
