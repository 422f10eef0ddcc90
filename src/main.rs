mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nexus_cloud::config::NexusConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nexus", version, about = "NEXUS Cloud API: item capture and prompt enrichment")]
struct Cli {
    /// Config file (defaults to ~/.nexus/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Print the resolved configuration and check the store is reachable
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NexusConfig::load_from(path)?,
        None => NexusConfig::load()?,
    };

    // Log to stderr so `doctor` output on stdout stays clean.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            nexus_cloud::server::serve(config).await?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config).await?;
        }
    }

    Ok(())
}
