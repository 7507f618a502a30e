// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch scheduler dialects
//!
//! A scheduler adapter only builds shell command text and parses the text
//! that comes back. Execution belongs to the [`crate::ShellAdapter`].

mod none;
mod pjm;
mod torque;

pub use none::NoneScheduler;
pub use pjm::PjmScheduler;
pub use torque::TorqueScheduler;

use fl_core::RemoteJobState;
use thiserror::Error;

/// Scheduler tags accepted in host configuration
pub const SCHEDULER_TAGS: [&str; 3] = ["none", "torque", "pjm"];

/// Errors from adapter construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown scheduler type '{0}' (expected one of: none, torque, pjm)")]
    UnknownScheduler(String),
}

/// Job-control protocol shared by every scheduler dialect
pub trait JobScheduler {
    /// Command that submits `script` and prints the job handle
    fn submit_command(&self, script: &str) -> String;

    /// Command that lists every job on the host at once
    fn all_status_command(&self) -> String;

    /// Command that queries a single job
    fn status_command(&self, job_id: &str) -> String;

    /// Command that removes a job from the back end
    fn cancel_command(&self, job_id: &str) -> String;

    /// Extract the job handle from submit output
    fn parse_submit_output(&self, stdout: &str) -> Option<String>;

    /// Lines of a bulk listing that describe `job_id`
    fn job_status_lines(&self, all_status: &str, job_id: &str) -> String;

    /// Map status text to the uniform job state
    fn parse_remote_status(&self, raw: &str) -> RemoteJobState;
}

/// The fixed set of supported schedulers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAdapter {
    None(NoneScheduler),
    Torque(TorqueScheduler),
    Pjm(PjmScheduler),
}

impl SchedulerAdapter {
    /// Build the adapter for a host's scheduler tag
    pub fn new(tag: &str) -> Result<Self, ConfigurationError> {
        match tag {
            "none" => Ok(SchedulerAdapter::None(NoneScheduler)),
            "torque" => Ok(SchedulerAdapter::Torque(TorqueScheduler)),
            "pjm" => Ok(SchedulerAdapter::Pjm(PjmScheduler)),
            other => Err(ConfigurationError::UnknownScheduler(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            SchedulerAdapter::None(_) => "none",
            SchedulerAdapter::Torque(_) => "torque",
            SchedulerAdapter::Pjm(_) => "pjm",
        }
    }

    fn inner(&self) -> &dyn JobScheduler {
        match self {
            SchedulerAdapter::None(s) => s,
            SchedulerAdapter::Torque(s) => s,
            SchedulerAdapter::Pjm(s) => s,
        }
    }
}

impl JobScheduler for SchedulerAdapter {
    fn submit_command(&self, script: &str) -> String {
        self.inner().submit_command(script)
    }

    fn all_status_command(&self) -> String {
        self.inner().all_status_command()
    }

    fn status_command(&self, job_id: &str) -> String {
        self.inner().status_command(job_id)
    }

    fn cancel_command(&self, job_id: &str) -> String {
        self.inner().cancel_command(job_id)
    }

    fn parse_submit_output(&self, stdout: &str) -> Option<String> {
        self.inner().parse_submit_output(stdout)
    }

    fn job_status_lines(&self, all_status: &str, job_id: &str) -> String {
        self.inner().job_status_lines(all_status, job_id)
    }

    fn parse_remote_status(&self, raw: &str) -> RemoteJobState {
        self.inner().parse_remote_status(raw)
    }
}

/// Last non-blank line of command output
fn last_line(raw: &str) -> Option<&str> {
    raw.lines().rev().map(str::trim).find(|line| !line.is_empty())
}

/// Whitespace-separated field of the last non-blank line
fn last_line_field(raw: &str, index: usize) -> Option<&str> {
    last_line(raw).and_then(|line| line.split_whitespace().nth(index))
}

/// Keep the lines for which `matches` holds, newline-joined
fn filter_lines(raw: &str, matches: impl Fn(&str) -> bool) -> String {
    raw.lines()
        .filter(|line| matches(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
