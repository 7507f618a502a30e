// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run record and its state machine
//!
//! A run moves through `created -> submitted -> running -> finished|failed`.
//! `running` may be skipped when a job exits between two polls. Transitions are
//! pure: [`Run::apply`] returns the updated record or a [`TransitionError`] and
//! never overwrites a state it does not expect.

use crate::host::SubmitTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Created,
    Submitted,
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    pub const ALL: [RunStatus; 5] = [
        RunStatus::Created,
        RunStatus::Submitted,
        RunStatus::Running,
        RunStatus::Finished,
        RunStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Created => "created",
            RunStatus::Submitted => "submitted",
            RunStatus::Running => "running",
            RunStatus::Finished => "finished",
            RunStatus::Failed => "failed",
        }
    }

    /// Submitted or running: the back end owns the job
    pub fn is_outstanding(&self) -> bool {
        matches!(self, RunStatus::Submitted | RunStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Finished | RunStatus::Failed)
    }

    /// Position in the lifecycle; never decreases for a given run
    pub fn rank(&self) -> u8 {
        match self {
            RunStatus::Created => 0,
            RunStatus::Submitted => 1,
            RunStatus::Running => 2,
            RunStatus::Finished | RunStatus::Failed => 3,
        }
    }

    /// Whether the state machine allows `self -> to`
    pub fn can_transition_to(&self, to: RunStatus) -> bool {
        matches!(
            (self, to),
            (RunStatus::Created, RunStatus::Submitted)
                | (RunStatus::Submitted, RunStatus::Running)
                | (RunStatus::Submitted, RunStatus::Finished)
                | (RunStatus::Submitted, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Finished)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown run status: {}", s))
    }
}

/// Scheduling priority; runs are picked high first, then FIFO
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        };
        f.write_str(name)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" | "0" => Ok(Priority::High),
            "normal" | "1" => Ok(Priority::Normal),
            "low" | "2" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// A capacity slot held by a submitter between its check and the submit write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub holder: String,
    pub host_id: String,
    pub reserved_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: std::time::Duration) -> bool {
        match chrono::Duration::from_std(timeout) {
            Ok(timeout) => now - self.reserved_at > timeout,
            Err(_) => false,
        }
    }
}

/// A guarded status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transition {
    /// created -> submitted
    Submit {
        job_id: String,
        host_id: String,
        at: DateTime<Utc>,
    },
    /// submitted -> running
    Start { hostname: String, at: DateTime<Utc> },
    /// submitted|running -> finished
    Finish {
        hostname: String,
        cpu_time: f64,
        real_time: f64,
        result: serde_json::Value,
        started_at: Option<DateTime<Utc>>,
        finished_at: DateTime<Utc>,
        included_at: DateTime<Utc>,
    },
    /// submitted|running -> failed
    Fail {
        hostname: String,
        error: String,
        started_at: Option<DateTime<Utc>>,
        included_at: DateTime<Utc>,
    },
}

impl Transition {
    pub fn target(&self) -> RunStatus {
        match self {
            Transition::Submit { .. } => RunStatus::Submitted,
            Transition::Start { .. } => RunStatus::Running,
            Transition::Finish { .. } => RunStatus::Finished,
            Transition::Fail { .. } => RunStatus::Failed,
        }
    }
}

/// Errors from run transitions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("illegal transition for run {id}: {from} -> {to}")]
    Illegal {
        id: String,
        from: RunStatus,
        to: RunStatus,
    },
    #[error("run {0} is discarded")]
    Discarded(String),
}

/// One unit of submitted work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub parameter_set_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub priority: Priority,
    pub seed: u32,
    pub mpi_procs: u32,
    pub omp_threads: u32,
    #[serde(default)]
    pub host_parameters: BTreeMap<String, String>,
    pub submitted_to: Option<SubmitTarget>,
    /// Concrete host chosen at submit time
    pub host_id: Option<String>,
    pub job_id: Option<String>,
    pub hostname: Option<String>,
    pub cpu_time: Option<f64>,
    pub real_time: Option<f64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub included_at: Option<DateTime<Utc>>,
    /// Consecutive polls that reported `unknown`
    #[serde(default)]
    pub unknown_polls: u32,
    #[serde(default)]
    pub reservation: Option<Reservation>,
    #[serde(default)]
    pub discarded: bool,
}

impl Run {
    /// Create a run in `created` status with a single-process resource request
    pub fn new(
        id: impl Into<String>,
        parameter_set_id: impl Into<String>,
        seed: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            parameter_set_id: parameter_set_id.into(),
            status: RunStatus::Created,
            priority: Priority::Normal,
            seed,
            mpi_procs: 1,
            omp_threads: 1,
            host_parameters: BTreeMap::new(),
            submitted_to: None,
            host_id: None,
            job_id: None,
            hostname: None,
            cpu_time: None,
            real_time: None,
            result: None,
            error: None,
            created_at,
            submitted_at: None,
            started_at: None,
            finished_at: None,
            included_at: None,
            unknown_polls: 0,
            reservation: None,
            discarded: false,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_target(mut self, target: SubmitTarget) -> Self {
        self.submitted_to = Some(target);
        self
    }

    pub fn with_resources(mut self, mpi_procs: u32, omp_threads: u32) -> Self {
        self.mpi_procs = mpi_procs.max(1);
        self.omp_threads = omp_threads.max(1);
        self
    }

    pub fn with_host_parameters(mut self, params: BTreeMap<String, String>) -> Self {
        self.host_parameters = params;
        self
    }

    /// Apply a transition, returning the updated run
    pub fn apply(&self, transition: &Transition) -> Result<Run, TransitionError> {
        if self.discarded {
            return Err(TransitionError::Discarded(self.id.clone()));
        }

        let to = transition.target();
        if !self.status.can_transition_to(to) {
            return Err(TransitionError::Illegal {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }

        let mut run = self.clone();
        run.status = to;
        run.unknown_polls = 0;

        match transition {
            Transition::Submit { job_id, host_id, at } => {
                run.job_id = Some(job_id.clone());
                run.host_id = Some(host_id.clone());
                run.submitted_at = Some(*at);
                run.reservation = None;
            }

            Transition::Start { hostname, at } => {
                run.hostname.get_or_insert_with(|| hostname.clone());
                run.started_at.get_or_insert(*at);
            }

            Transition::Finish {
                hostname,
                cpu_time,
                real_time,
                result,
                started_at,
                finished_at,
                included_at,
            } => {
                run.hostname = Some(hostname.clone());
                run.cpu_time = Some(*cpu_time);
                run.real_time = Some(*real_time);
                run.result = Some(result.clone());
                if run.started_at.is_none() {
                    run.started_at = *started_at;
                }
                run.finished_at = Some(*finished_at);
                run.included_at = Some(*included_at);
            }

            Transition::Fail {
                hostname,
                error,
                started_at,
                included_at,
            } => {
                run.hostname.get_or_insert_with(|| hostname.clone());
                if run.started_at.is_none() {
                    run.started_at = *started_at;
                }
                run.error = Some(error.clone());
                run.included_at = Some(*included_at);
            }
        }

        Ok(run)
    }

    /// Whether a live reservation currently holds a slot for this run
    pub fn is_reserved(&self, now: DateTime<Utc>, timeout: std::time::Duration) -> bool {
        self.reservation
            .as_ref()
            .is_some_and(|r| !r.is_stale(now, timeout))
    }

    /// Host this run occupies or is about to occupy
    pub fn occupied_host(&self) -> Option<&str> {
        if self.status.is_outstanding() {
            return self.host_id.as_deref();
        }
        if self.status == RunStatus::Created {
            return self.reservation.as_ref().map(|r| r.host_id.as_str());
        }
        None
    }

    /// Check the field invariants tied to the current status
    pub fn check_invariants(&self) -> Result<(), String> {
        let has_job = self.status != RunStatus::Created;
        if self.job_id.is_some() != has_job {
            return Err(format!("job_id presence wrong for {}", self.status));
        }

        let has_host = matches!(
            self.status,
            RunStatus::Running | RunStatus::Finished | RunStatus::Failed
        );
        if self.hostname.is_some() != has_host {
            return Err(format!("hostname presence wrong for {}", self.status));
        }

        let finished = self.status == RunStatus::Finished;
        if finished {
            if self.cpu_time.is_none()
                || self.real_time.is_none()
                || self.result.is_none()
                || self.finished_at.is_none()
                || self.included_at.is_none()
            {
                return Err("finished run is missing results".to_string());
            }
        } else if self.cpu_time.is_some()
            || self.real_time.is_some()
            || self.result.is_some()
            || self.finished_at.is_some()
        {
            return Err(format!("{} run carries results", self.status));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
