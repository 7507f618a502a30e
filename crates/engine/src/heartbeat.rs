// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon liveness from heartbeat artifacts
//!
//! A daemon leaves its pid in `pids/<daemon>.pid` and writes a heartbeat line
//! to `logs/<daemon>.log` every cycle. A live process whose log has gone
//! quiet is reported as hanging.

use crate::context::DaemonKind;
use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Running,
    Hanging,
    NotRunning,
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Liveness::Running => "running",
            Liveness::Hanging => "hanging",
            Liveness::NotRunning => "not running",
        };
        f.write_str(text)
    }
}

/// Result of inspecting one daemon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaemonHealth {
    pub daemon: String,
    pub liveness: Liveness,
    pub pid: Option<i32>,
    pub log_modified: Option<DateTime<Utc>>,
}

/// Inspect every daemon as of now
pub fn inspect_all(state_dir: &Path, stale_after: Duration) -> Vec<DaemonHealth> {
    let now = SystemTime::now();
    DaemonKind::ALL
        .into_iter()
        .map(|kind| inspect(kind, state_dir, stale_after, now))
        .collect()
}

/// Classify one daemon from its pid file and log modification time
pub fn inspect(
    kind: DaemonKind,
    state_dir: &Path,
    stale_after: Duration,
    now: SystemTime,
) -> DaemonHealth {
    let pid = read_pid(&kind.pid_path(state_dir)).filter(|pid| process_alive(*pid));
    let log_modified = std::fs::metadata(kind.log_path(state_dir))
        .and_then(|meta| meta.modified())
        .ok();

    let liveness = match (pid, log_modified) {
        (None, _) => Liveness::NotRunning,
        (Some(_), Some(modified)) if is_fresh(modified, now, stale_after) => Liveness::Running,
        (Some(_), _) => Liveness::Hanging,
    };

    DaemonHealth {
        daemon: kind.as_str().to_string(),
        liveness,
        pid,
        log_modified: log_modified.map(DateTime::<Utc>::from),
    }
}

fn read_pid(path: &Path) -> Option<i32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.trim().parse().ok().filter(|pid| *pid > 0)
}

/// Signal 0 probes for existence; EPERM still means the process exists
fn process_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

fn is_fresh(modified: SystemTime, now: SystemTime, stale_after: Duration) -> bool {
    match now.duration_since(modified) {
        Ok(age) => age <= stale_after,
        // Modified "in the future" (clock skew): treat as fresh
        Err(_) => true,
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
