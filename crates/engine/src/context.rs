// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon identity, artifact paths and the shared polling loop

use crate::error::EngineError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

/// The three long-running daemons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonKind {
    Submitter,
    Observer,
    Service,
}

impl DaemonKind {
    pub const ALL: [DaemonKind; 3] = [
        DaemonKind::Submitter,
        DaemonKind::Observer,
        DaemonKind::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonKind::Submitter => "submitter",
            DaemonKind::Observer => "observer",
            DaemonKind::Service => "service",
        }
    }

    /// `<state_dir>/pids/<daemon>.pid`
    pub fn pid_path(&self, state_dir: &Path) -> PathBuf {
        state_dir.join("pids").join(format!("{}.pid", self.as_str()))
    }

    /// `<state_dir>/logs/<daemon>.log`
    pub fn log_path(&self, state_dir: &Path) -> PathBuf {
        state_dir.join("logs").join(format!("{}.log", self.as_str()))
    }
}

impl fmt::Display for DaemonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DaemonKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DaemonKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown daemon: {}", s))
    }
}

/// Everything a daemon loop needs from its process
#[derive(Debug, Clone)]
pub struct DaemonContext {
    pub kind: DaemonKind,
    pub interval: Duration,
    pub cancel: CancellationToken,
    pub pid_path: PathBuf,
    pub log_path: PathBuf,
}

impl DaemonContext {
    pub fn new(kind: DaemonKind, state_dir: &Path, interval: Duration) -> Self {
        Self {
            kind,
            interval,
            cancel: CancellationToken::new(),
            pid_path: kind.pid_path(state_dir),
            log_path: kind.log_path(state_dir),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// One unit of periodic work
#[async_trait]
pub trait Cycle {
    /// Run one cycle; errors are logged and the loop continues
    async fn tick(&mut self) -> Result<(), EngineError>;
}

/// Tick at a fixed interval until cancelled
///
/// Cancellation is only observed between cycles, never in the middle of one.
/// Each completed cycle logs a heartbeat and touches the log file, so the
/// log's mtime tracks liveness under any `RUST_LOG` filter.
pub async fn run_periodic<C: Cycle + Send>(ctx: &DaemonContext, cycle: &mut C) -> u64 {
    let daemon = ctx.kind.as_str();
    tracing::info!(daemon, interval = ?ctx.interval, "starting");

    let mut cycles = 0u64;
    loop {
        if let Err(e) = cycle.tick().await {
            tracing::error!(daemon, error = %e, "cycle failed");
        }
        cycles += 1;
        tracing::info!(daemon, cycle = cycles, "heartbeat");
        touch_log(&ctx.log_path);

        if ctx.cancel.is_cancelled() {
            break;
        }
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(ctx.interval) => {}
        }
    }

    tracing::info!(daemon, cycles, "stopped");
    cycles
}

fn touch_log(path: &Path) {
    let touched = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .and_then(|file| file.set_modified(SystemTime::now()));
    if let Err(e) = touched {
        tracing::warn!(path = %path.display(), error = %e, "failed to touch log");
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
