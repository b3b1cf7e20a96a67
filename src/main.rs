//! Sillage main entry point
//!
//! This is the command-line interface for the Sillage perfume harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sillage::config::{load_config_with_hash, validate, Config};
use sillage::crawler::harvest;
use sillage::state::RunPhase;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sillage: a patient perfume catalog harvester
///
/// Sillage discovers perfume pages through the catalog's search, extracts
/// structured records from each page, and saves them as JSON and CSV with
/// periodic checkpoints. Press Ctrl-C to stop and keep what was collected.
#[derive(Parser, Debug)]
#[command(name = "sillage")]
#[command(version = "1.0.0")]
#[command(about = "A patient perfume catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override discovery keys; each character is one key
    #[arg(long, value_name = "CHARS")]
    keys: Option<String>,

    /// Override the artifact directory
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Show the resolved configuration and search URLs without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration after command-line overrides")?;

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Received interrupt, saving progress (press Ctrl-C again to quit now)");
        on_signal.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt, exiting without saving");
            std::process::exit(130);
        }
    });

    let report = harvest(&config, cancel).await.context("failed to start harvest")?;

    for artifact in &report.artifacts {
        tracing::info!("Artifact: {}", artifact.display());
    }

    match report.outcome {
        RunPhase::Failed => anyhow::bail!(
            "harvest failed after {} records; see the log for the cause",
            report.records
        ),
        _ => Ok(()),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sillage=info,warn"),
            1 => EnvFilter::new("sillage=debug,info"),
            2 => EnvFilter::new("sillage=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(keys) = &cli.keys {
        config.discovery.keys = keys
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect();
    }

    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.display().to_string();
    }
}

/// Handles the --dry-run mode
fn print_dry_run(config: &Config) {
    println!("=== Sillage Dry Run ===\n");

    println!("Fetcher:");
    println!("  Max retries: {}", config.fetcher.max_retries);
    println!(
        "  Backoff: min({}s, 2^n * {}s)",
        config.fetcher.backoff_cap_secs, config.fetcher.backoff_base_secs
    );
    println!(
        "  Throttle wait without hint: {}s",
        config.fetcher.throttle_wait_secs
    );
    println!("  User agent: {}", config.user_agent.value);

    println!("\nDelays (ms):");
    for (name, range) in [
        ("after fetch", config.delays.after_fetch),
        ("between keys", config.delays.between_keys),
        ("between items", config.delays.between_items),
    ] {
        println!("  {}: {}-{}", name, range.min_ms, range.max_ms);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Stem: {}", config.output.artifact_stem);
    println!(
        "  Checkpoint every {} records",
        config.output.checkpoint_interval
    );

    println!("\nSearch URLs ({}):", config.discovery.keys.len());
    for key in &config.discovery.keys {
        println!("  - {}", config.discovery.search_url_for(key));
    }

    println!("\n✓ Configuration is valid");
}
