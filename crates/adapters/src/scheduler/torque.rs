// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Torque / PBS dialect

use super::{filter_lines, last_line, last_line_field, JobScheduler};
use fl_core::RemoteJobState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TorqueScheduler;

/// Index of the state column (`S`) in `qstat` output
const STATE_FIELD: usize = 4;

/// `1234.server.example.org` -> `1234`; qstat truncates the server part
fn job_number(job_id: &str) -> &str {
    job_id.split('.').next().unwrap_or(job_id)
}

impl JobScheduler for TorqueScheduler {
    fn submit_command(&self, script: &str) -> String {
        format!("qsub {}", script)
    }

    fn all_status_command(&self) -> String {
        "qstat; pbsnodes -a".to_string()
    }

    fn status_command(&self, job_id: &str) -> String {
        format!("qstat {}", job_id)
    }

    fn cancel_command(&self, job_id: &str) -> String {
        format!("qdel {}", job_id)
    }

    fn parse_submit_output(&self, stdout: &str) -> Option<String> {
        last_line(stdout)
            .and_then(|line| line.split_whitespace().next())
            .map(str::to_string)
    }

    fn job_status_lines(&self, all_status: &str, job_id: &str) -> String {
        let number = job_number(job_id);
        if number.is_empty() {
            return String::new();
        }
        filter_lines(all_status, |line| {
            line.split_whitespace()
                .next()
                .is_some_and(|first| job_number(first) == number)
        })
    }

    fn parse_remote_status(&self, raw: &str) -> RemoteJobState {
        let Some(state) = last_line_field(raw, STATE_FIELD) else {
            return RemoteJobState::Unknown;
        };
        if state.contains('Q') {
            RemoteJobState::Submitted
        } else if state.contains('C') {
            RemoteJobState::Includable
        } else if state.contains('R') || state.contains('T') {
            RemoteJobState::Running
        } else {
            RemoteJobState::Unknown
        }
    }
}
