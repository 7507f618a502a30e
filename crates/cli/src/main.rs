// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fl - Flotilla CLI

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{daemon, host, run};
use fl_engine::{resolve_config_path, Config};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fl",
    version,
    about = "Flotilla - batch runs across clusters and their schedulers"
)]
struct Cli {
    /// Config file (default: $FLOTILLA_CONFIG, then ./flotilla.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run management
    Run(run::RunArgs),
    /// Configured hosts and their load
    Host(host::HostArgs),
    /// Daemon health
    Daemon(daemon::DaemonArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let config_path = resolve_config_path(cli.config);
    let config = Config::load(&config_path)
        .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
    tracing::debug!(
        config = %config_path.display(),
        state_dir = %config.state_dir.display(),
        "loaded config"
    );

    match cli.command {
        Commands::Run(args) => run::handle(args.command, &config, cli.output).await,
        Commands::Host(args) => host::handle(args.command, &config, cli.output),
        Commands::Daemon(args) => daemon::handle(args.command, &config, cli.output),
    }
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
