// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain background process, no batch system
//!
//! The job handle is the script's file name, which is what `ps` shows in the
//! command column.

use super::{filter_lines, last_line, JobScheduler};
use fl_core::RemoteJobState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoneScheduler;

/// `abc.sh` -> `[a]bc.sh`, so grep never matches its own command line
fn bracket_pattern(job_id: &str) -> String {
    let mut chars = job_id.chars();
    match chars.next() {
        Some(first) => format!("[{}]{}", first, chars.as_str()),
        None => String::new(),
    }
}

impl JobScheduler for NoneScheduler {
    fn submit_command(&self, script: &str) -> String {
        format!(
            "nohup bash {} > /dev/null 2>&1 < /dev/null & basename {}",
            script, script
        )
    }

    fn all_status_command(&self) -> String {
        "ps ux".to_string()
    }

    fn status_command(&self, job_id: &str) -> String {
        format!("ps ux | grep \"{}\"", bracket_pattern(job_id))
    }

    fn cancel_command(&self, job_id: &str) -> String {
        format!(
            "kill -- -`ps x -o \"pgid pid command\" | grep \"{}\" | awk '{{print $1}}'`",
            bracket_pattern(job_id)
        )
    }

    fn parse_submit_output(&self, stdout: &str) -> Option<String> {
        last_line(stdout).map(str::to_string)
    }

    fn job_status_lines(&self, all_status: &str, job_id: &str) -> String {
        if job_id.is_empty() {
            return String::new();
        }
        let suffix = format!("/{}", job_id);
        filter_lines(all_status, |line| {
            line.split_whitespace()
                .any(|token| token == job_id || token.ends_with(&suffix))
        })
    }

    fn parse_remote_status(&self, raw: &str) -> RemoteJobState {
        if raw.trim().is_empty() {
            RemoteJobState::Unknown
        } else {
            RemoteJobState::Running
        }
    }
}
