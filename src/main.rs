//! mergeq command-line entry point

mod cli;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mergeq::config::default_config_path;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mergeq", version, about = "Serialized merge queue for GitHub pull requests")]
struct Cli {
    /// Path to the configuration file (default: ./cfg.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the merge queue until interrupted
    Serve {
        /// Run one drive pass and exit
        #[arg(long)]
        once: bool,
    },
    /// Show the current queue of every repository
    Status,
    /// Validate the configuration file
    Check,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "mergeq=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Serve { once } => cli::run_serve(&path, cli::ServeOptions { once })
            .await
            .context("merge queue stopped with an error"),
        Commands::Status => cli::run_status(&path)
            .await
            .context("failed to load queue status"),
        Commands::Check => cli::run_check(&path).context("configuration check failed"),
    }
}
