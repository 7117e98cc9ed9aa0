//! chansync CLI - replicate local folder trees into Teams channel libraries
//!
//! Commands:
//! - `chansync run` - execute every configured mapping and print a summary
//! - `chansync check` - validate the configuration and source directories

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chansync_core::config::Config;
use chansync_engine::replicator::{Replicator, RunReport};
use chansync_graph::auth::{ClientCredentialLease, LeaseConfig};
use chansync_graph::client::GraphClient;
use chansync_graph::gate::RetryPolicy;

mod summary;

#[derive(Debug, Parser)]
#[command(
    name = "chansync",
    version,
    about = "Replicate local folder trees into Microsoft Teams channel libraries"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true, default_value = "chansync.yaml")]
    config: PathBuf,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute every configured mapping
    Run(RunCommand),
    /// Validate the configuration and source directories
    Check,
}

#[derive(Debug, Args)]
struct RunCommand {
    /// Write the JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let directives = format!(
        "chansync_cli={level},chansync_core={level},chansync_graph={level},chansync_engine={level}"
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run(cmd) => run(config, cmd).await,
        Commands::Check => check(config),
    }
}

async fn run(config: Config, cmd: RunCommand) -> Result<()> {
    let secret = config.client_secret()?;
    let lease = ClientCredentialLease::new(LeaseConfig::new(
        config.auth.tenant_id.clone(),
        config.auth.client_id.clone(),
        secret,
    ))?;

    let client = Arc::new(
        GraphClient::new(Arc::new(lease)).with_retry_policy(RetryPolicy::from(&config.retry)),
    );

    let replicator = Replicator::new(client, config);
    let report = replicator.run().await;

    summary::print(&report);

    if let Some(path) = cmd.report {
        write_report(&report, &path)?;
        println!("report written to {}", path.display());
    }

    // Per-item failures do not fail the process; a run that never reached
    // any destination does.
    if !report.entries.is_empty() && report.entries.iter().all(|e| e.aborted) {
        bail!("every mapping entry aborted; see the error summary above");
    }

    Ok(())
}

fn check(config: Config) -> Result<()> {
    for mapping in &config.mappings {
        for source in &mapping.sources {
            let name = source.remote_name()?;
            let meta = std::fs::metadata(&source.path).with_context(|| {
                format!("source {} is not accessible", source.path.display())
            })?;
            if !meta.is_dir() {
                bail!("source {} is not a directory", source.path.display());
            }
            println!(
                "\u{2713} {} -> {}/{} as \"{}\"",
                source.path.display(),
                mapping.group_id,
                mapping.channel_id,
                name
            );
        }
    }
    println!("configuration ok");
    Ok(())
}

fn write_report(report: &RunReport, path: &PathBuf) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}
