// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flotilla Daemon (fld)
//!
//! Runs one of the submitter, observer or service loops until signalled.

use std::path::Path;

use fl_daemon::lifecycle::{self, Args, LifecycleError};
use fl_engine::{resolve_config_path, Config, DaemonContext};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = Args::parse(&args)?;

    // Load configuration; an invalid scheduler tag stops us here
    let config_path = resolve_config_path(args.config);
    let config = Config::load(&config_path).map_err(LifecycleError::from)?;

    let ctx = DaemonContext::new(
        args.kind,
        &config.state_dir,
        lifecycle::interval(&config, args.kind),
    );

    // Write startup marker to log (before tracing setup)
    lifecycle::write_startup_marker(&ctx)?;

    // Set up logging
    let log_guard = setup_logging(&ctx.log_path)?;

    info!(
        "Starting fld {} with config {}",
        ctx.kind,
        config_path.display()
    );

    let (lock, store) = match lifecycle::startup(&ctx, &config) {
        Ok(started) => started,
        Err(e) => {
            lifecycle::write_startup_error(&ctx, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    spawn_signal_handler(ctx.cancel.clone())?;

    let cycles = lifecycle::run(&ctx, config, store).await;
    info!(cycles, "loop finished");

    lifecycle::shutdown(&ctx, lock);
    Ok(())
}

/// Cancel the loop on SIGTERM or SIGINT; the current cycle always completes
fn spawn_signal_handler(cancel: CancellationToken) -> Result<(), LifecycleError> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
        cancel.cancel();
    });
    Ok(())
}

fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path
        .parent()
        .ok_or_else(|| LifecycleError::NoLogDir(log_path.to_path_buf()))?;
    let file = log_path
        .file_name()
        .ok_or_else(|| LifecycleError::NoLogDir(log_path.to_path_buf()))?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}
