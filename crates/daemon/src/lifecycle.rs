// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, run loop, shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fl_adapters::{
    DirectoryResults, DirectoryScripts, SystemShell, TracedResults, TracedScripts, TracedShell,
};
use fl_core::SystemClock;
use fl_engine::{
    run_periodic, Config, ConfigError, DaemonContext, DaemonKind, HealthMonitor, Observer,
    Submitter,
};
use fl_storage::{Store, StoreError};
use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- fld submitter: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- fld ";

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("usage: fld <submitter|observer|service> [config]")]
    Usage,

    #[error("{0}")]
    UnknownDaemon(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Log path has no parent directory: {0}")]
    NoLogDir(PathBuf),

    #[error("Failed to acquire lock: {0} already running?")]
    LockFailed(DaemonKind, #[source] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command line: which daemon and which config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub kind: DaemonKind,
    pub config: Option<PathBuf>,
}

impl Args {
    /// Parse `fld <daemon> [config]` (program name already stripped)
    pub fn parse(args: &[String]) -> Result<Self, LifecycleError> {
        match args {
            [kind] => Ok(Self {
                kind: kind.parse().map_err(LifecycleError::UnknownDaemon)?,
                config: None,
            }),
            [kind, config] => Ok(Self {
                kind: kind.parse().map_err(LifecycleError::UnknownDaemon)?,
                config: Some(PathBuf::from(config)),
            }),
            _ => Err(LifecycleError::Usage),
        }
    }
}

/// Interval of the given daemon's loop
pub fn interval(config: &Config, kind: DaemonKind) -> Duration {
    match kind {
        DaemonKind::Submitter => config.submitter.interval,
        DaemonKind::Observer => config.observer.interval,
        DaemonKind::Service => config.service.interval,
    }
}

/// Exclusive hold on a daemon's pid file
///
/// A second instance of the same daemon fails to start while this is held.
#[derive(Debug)]
pub struct PidLock {
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl PidLock {
    pub fn acquire(kind: DaemonKind, path: &Path) -> Result<Self, LifecycleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Open without truncating: the pid of a running instance must survive
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|e| LifecycleError::LockFailed(kind, e))?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Remove the pid file; the lock itself goes with the handle
    pub fn release(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove PID file: {}", e);
        }
    }
}

/// Write the startup marker to the daemon log (appends to existing log)
pub fn write_startup_marker(ctx: &DaemonContext) -> Result<(), LifecycleError> {
    let mut file = open_log(&ctx.log_path)?;
    writeln!(
        file,
        "{}{}: starting (pid: {}) ---",
        STARTUP_MARKER_PREFIX,
        ctx.kind,
        std::process::id()
    )?;
    Ok(())
}

/// Write a startup error synchronously; tracing is non-blocking and may
/// not flush before the process exits.
pub fn write_startup_error(ctx: &DaemonContext, error: &LifecycleError) {
    let Ok(mut file) = open_log(&ctx.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start {}: {}", ctx.kind, error);
}

fn open_log(path: &Path) -> Result<File, LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Take the pid lock and open the store
pub fn startup(ctx: &DaemonContext, config: &Config) -> Result<(PidLock, Store), LifecycleError> {
    let lock = PidLock::acquire(ctx.kind, &ctx.pid_path)?;
    match Store::open(&config.state_dir) {
        Ok(store) => {
            info!(
                daemon = %ctx.kind,
                runs = store.state().runs.len(),
                state_dir = %config.state_dir.display(),
                "daemon started"
            );
            Ok((lock, store))
        }
        Err(e) => {
            lock.release();
            Err(e.into())
        }
    }
}

/// Run the daemon's loop until cancelled; returns the number of cycles
pub async fn run(ctx: &DaemonContext, config: Config, store: Store) -> u64 {
    let shell = TracedShell::new(SystemShell::new());
    match ctx.kind {
        DaemonKind::Submitter => {
            let scripts = TracedScripts::new(DirectoryScripts::new(config.scripts.dir.clone()));
            let mut submitter = Submitter::new(config, store, shell, scripts, SystemClock);
            run_periodic(ctx, &mut submitter).await
        }
        DaemonKind::Observer => {
            let results = TracedResults::new(DirectoryResults::new(config.results.dir.clone()));
            let mut observer = Observer::new(config, store, shell, results, SystemClock);
            run_periodic(ctx, &mut observer).await
        }
        DaemonKind::Service => {
            let mut monitor = HealthMonitor::new(config, store, SystemClock);
            run_periodic(ctx, &mut monitor).await
        }
    }
}

/// Shut down after the loop has exited
pub fn shutdown(ctx: &DaemonContext, lock: PidLock) {
    info!(daemon = %ctx.kind, "shutting down");
    lock.release();
    info!(daemon = %ctx.kind, "shutdown complete");
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
