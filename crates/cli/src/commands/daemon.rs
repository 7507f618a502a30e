// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fl daemon` - heartbeat inspection of the running daemons

use crate::output::{self, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use fl_engine::heartbeat::inspect_all;
use fl_engine::{Config, DaemonHealth, StatusCache};
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Show whether each daemon is running, hanging or stopped
    Status,
}

#[derive(Serialize)]
struct DaemonStatus {
    daemons: Vec<DaemonHealth>,
    status_cache: Option<StatusCache>,
    #[serde(skip)]
    now: DateTime<Utc>,
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for daemon in &self.daemons {
            write!(f, "{:<10} {}", daemon.daemon, daemon.liveness)?;
            if let Some(pid) = daemon.pid {
                write!(f, " (pid {})", pid)?;
            }
            if let Some(modified) = daemon.log_modified {
                write!(f, ", last log {} ago", format_age(self.now, modified))?;
            }
            writeln!(f)?;
        }
        match &self.status_cache {
            Some(cache) => write!(
                f,
                "Status cache: {} runs, updated {} ago",
                cache.overall.total,
                format_age(self.now, cache.updated_at)
            ),
            None => write!(f, "Status cache: none"),
        }
    }
}

/// Coarse age such as `42s`, `5m` or `3h`
fn format_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86400),
    }
}

pub fn handle(command: DaemonCommand, config: &Config, format: OutputFormat) -> Result<()> {
    match command {
        DaemonCommand::Status => {
            let status = DaemonStatus {
                daemons: inspect_all(&config.state_dir, config.service.log_stale_after),
                status_cache: StatusCache::load(&config.cache_path())?,
                now: Utc::now(),
            };
            output::print(&status, format)
        }
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
