//! rq - coalescing request queue
//!
//! CLI entry point for simulating workloads and inspecting configuration.

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use requestqueue::cli::{Cli, Command, OutputFormat, generate_after_help, get_log_path};
use requestqueue::config::Config;
use requestqueue::simulate::{SimulationReport, run_simulation};

fn parse_level(s: &str) -> tracing::Level {
    match s.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);

    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    if let Err(e) = setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()) {
        eprintln!("Warning: {:#}, logging disabled", e);
    }

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Simulate {
            keys,
            subscribers,
            failure_rate,
            latency_ms,
            concurrency,
            retries,
            no_cache,
            format,
        }) => {
            let mut config = config;
            if let Some(keys) = keys {
                config.simulation.keys = keys;
            }
            if let Some(subscribers) = subscribers {
                config.simulation.subscribers_per_key = subscribers;
            }
            if let Some(failure_rate) = failure_rate {
                config.simulation.failure_rate = failure_rate;
            }
            if let Some(latency_ms) = latency_ms {
                config.simulation.latency_ms = latency_ms;
            }
            if let Some(concurrency) = concurrency {
                config.queue.concurrency_limit = concurrency;
            }
            if let Some(retries) = retries {
                config.queue.max_retry_times = retries;
            }
            if no_cache {
                config.cache = None;
            }
            cmd_simulate(&config, format).await
        }
        Some(Command::Config { format }) => cmd_config(&config, format),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

async fn cmd_simulate(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_simulate: called");
    config.validate()?;

    let report = run_simulation(&config.queue, config.cache.clone(), &config.simulation).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("{}", "Simulation".bold());
    println!(
        "  {:<14} {} keys x {} subscribers",
        "workload",
        report.keys,
        report.subscribers / report.keys.max(1)
    );
    println!("  {:<14} {}", "succeeded", report.succeeded.to_string().green());
    let failed = report.failed.to_string();
    println!(
        "  {:<14} {}",
        "failed",
        if report.failed > 0 { failed.red() } else { failed.normal() }
    );
    println!("  {:<14} {}", "invocations", report.invocations);
    println!("  {:<14} {}", "cached", report.cached);
    println!("  {:<14} {}ms", "elapsed", report.elapsed_ms);

    let stats = &report.stats;
    println!("{}", "Queue".bold());
    println!("  {:<14} {}", "submitted", stats.submitted);
    println!("  {:<14} {}", "coalesced", stats.coalesced.to_string().cyan());
    println!("  {:<14} {}", "started", stats.started);
    println!("  {:<14} {}", "retried", stats.retried.to_string().yellow());
    println!("  {:<14} {}", "delivered", stats.delivered);
    println!("  {:<14} {}", "peak running", stats.peak_running);
}

fn cmd_config(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_config: called");
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Yaml | OutputFormat::Text => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}
