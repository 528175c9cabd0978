//! Stat-Xplore CLI - command-line client for the Stat-Xplore API.
//!
//! The main entry point for the `statx` binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statx_cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();
    let config = cli.config();

    // Create runtime and execute
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Discover(args) => statx_cli::commands::discover::execute(args, &config).await,
            Commands::Fields(args) => statx_cli::commands::fields::execute(args, &config).await,
            Commands::Fetch(args) => statx_cli::commands::fetch::execute(args, &config).await,
        }
    })
}
