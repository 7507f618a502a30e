// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fujitsu PJM dialect

use super::{filter_lines, last_line_field, JobScheduler};
use fl_core::RemoteJobState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PjmScheduler;

/// Index of the state column (`ST`) in `pjstat` output
const STATE_FIELD: usize = 3;

fn is_job_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

impl JobScheduler for PjmScheduler {
    fn submit_command(&self, script: &str) -> String {
        format!("pjsub {}", script)
    }

    fn all_status_command(&self) -> String {
        "pjstat".to_string()
    }

    fn status_command(&self, job_id: &str) -> String {
        format!("pjstat {}", job_id)
    }

    fn cancel_command(&self, job_id: &str) -> String {
        format!("pjdel {}", job_id)
    }

    /// `[INFO] PJM 0000 pjsub Job 12345 submitted.` -> `12345`
    fn parse_submit_output(&self, stdout: &str) -> Option<String> {
        let tokens: Vec<&str> = stdout.split_whitespace().collect();
        tokens
            .windows(2)
            .find(|pair| pair[0] == "Job" && is_job_number(pair[1]))
            .map(|pair| pair[1])
            .or_else(|| {
                // "0000" is PJM's message code, never a job number
                tokens
                    .iter()
                    .copied()
                    .find(|token| is_job_number(token) && !token.starts_with('0'))
            })
            .map(str::to_string)
    }

    fn job_status_lines(&self, all_status: &str, job_id: &str) -> String {
        if job_id.is_empty() {
            return String::new();
        }
        filter_lines(all_status, |line| line.split_whitespace().next() == Some(job_id))
    }

    fn parse_remote_status(&self, raw: &str) -> RemoteJobState {
        match last_line_field(raw, STATE_FIELD) {
            Some("ACC" | "QUE") => RemoteJobState::Submitted,
            Some("SIN" | "RDY" | "RNA" | "RUN" | "RNO" | "SOT") => RemoteJobState::Running,
            Some("EXT" | "CCL") => RemoteJobState::Includable,
            _ => RemoteJobState::Unknown,
        }
    }
}
