// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use chrono::{DateTime, Utc};
use fl_core::{Operation, Run, RunStatus, TransitionError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use thiserror::Error;

/// Reasons an operation does not apply to the current state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("run not found: {0}")]
    NotFound(String),
    #[error("run {0} already exists")]
    Duplicate(String),
    #[error("run {id} is {actual}, expected {expected}")]
    Conflict {
        id: String,
        expected: RunStatus,
        actual: RunStatus,
    },
    #[error("run {0} is discarded")]
    Discarded(String),
    #[error("run {id} is not reserved by {holder}")]
    NotHolder { id: String, holder: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Run counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub created: usize,
    pub submitted: usize,
    pub running: usize,
    pub finished: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: RunStatus) {
        self.total += 1;
        match status {
            RunStatus::Created => self.created += 1,
            RunStatus::Submitted => self.submitted += 1,
            RunStatus::Running => self.running += 1,
            RunStatus::Finished => self.finished += 1,
            RunStatus::Failed => self.failed += 1,
        }
    }
}

/// Materialized state built from WAL operations
#[derive(Debug, Default, Clone)]
pub struct MaterializedState {
    pub runs: BTreeMap<String, Run>,
}

impl MaterializedState {
    /// Get a run by ID or unique prefix (like git commit hashes)
    pub fn get_run(&self, id: &str) -> Option<&Run> {
        if let Some(run) = self.runs.get(id) {
            return Some(run);
        }

        let mut matches = self
            .runs
            .range(id.to_string()..)
            .take_while(|(k, _)| k.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some((_, run)), None) => Some(run),
            _ => None,
        }
    }

    /// Check that an operation applies cleanly to the current state
    pub fn check(&self, op: &Operation) -> Result<(), StateError> {
        let id = op.run_id();
        let run = match (op, self.runs.get(id)) {
            (Operation::RunCreate { .. }, Some(_)) => {
                return Err(StateError::Duplicate(id.to_string()))
            }
            (Operation::RunCreate { .. }, None) => return Ok(()),
            (_, None) => return Err(StateError::NotFound(id.to_string())),
            (_, Some(run)) => run,
        };

        if run.discarded {
            return Err(StateError::Discarded(id.to_string()));
        }
        if let Some(expected) = op.expected_status() {
            if run.status != expected {
                return Err(StateError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: run.status,
                });
            }
        }

        match op {
            Operation::RunTransition { transition, .. } => {
                run.apply(transition)?;
            }
            Operation::RunRelease { holder, .. } => {
                let held = run.reservation.as_ref().is_some_and(|r| &r.holder == holder);
                if !held {
                    return Err(StateError::NotHolder {
                        id: id.to_string(),
                        holder: holder.clone(),
                    });
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Apply an operation to update the state
    ///
    /// Operations that no longer match (e.g. replayed after a conflicting
    /// write) leave the state unchanged.
    pub fn apply(&mut self, op: &Operation) {
        if self.check(op).is_err() {
            tracing::debug!(run_id = op.run_id(), "skipping inapplicable operation");
            return;
        }

        match op {
            Operation::RunCreate { run } => {
                self.runs.insert(run.id.clone(), run.clone());
            }

            Operation::RunTransition { id, transition, .. } => {
                if let Some(run) = self.runs.get_mut(id) {
                    if let Ok(next) = run.apply(transition) {
                        *run = next;
                    }
                }
            }

            Operation::RunReserve { id, reservation } => {
                if let Some(run) = self.runs.get_mut(id) {
                    run.reservation = Some(reservation.clone());
                }
            }

            Operation::RunRelease { id, .. } => {
                if let Some(run) = self.runs.get_mut(id) {
                    run.reservation = None;
                }
            }

            Operation::RunUnknownObserved { id, count, .. } => {
                if let Some(run) = self.runs.get_mut(id) {
                    run.unknown_polls = *count;
                }
            }

            Operation::RunDiscard { id, .. } => {
                if let Some(run) = self.runs.get_mut(id) {
                    run.discarded = true;
                    run.reservation = None;
                }
            }
        }
    }

    /// Live (non-discarded) runs in the given status
    pub fn runs_with_status(&self, status: RunStatus) -> impl Iterator<Item = &Run> {
        self.runs
            .values()
            .filter(move |run| !run.discarded && run.status == status)
    }

    /// Created runs in submission order: priority first, then creation time
    pub fn pending_runs(&self) -> Vec<&Run> {
        let mut runs: Vec<&Run> = self.runs_with_status(RunStatus::Created).collect();
        runs.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        runs
    }

    /// Submitted and running runs placed on a host
    pub fn outstanding_on<'a>(&'a self, host_id: &'a str) -> impl Iterator<Item = &'a Run> + 'a {
        self.runs.values().filter(move |run| {
            !run.discarded
                && run.status.is_outstanding()
                && run.host_id.as_deref() == Some(host_id)
        })
    }

    /// Slots in use on a host: outstanding runs plus live reservations
    pub fn occupied_slots(
        &self,
        host_id: &str,
        now: DateTime<Utc>,
        reservation_timeout: Duration,
    ) -> usize {
        self.runs
            .values()
            .filter(|run| !run.discarded && run.occupied_host() == Some(host_id))
            .filter(|run| {
                run.status != RunStatus::Created || run.is_reserved(now, reservation_timeout)
            })
            .count()
    }

    /// Status counts over the given ids, or over every live run
    ///
    /// Unknown and discarded ids are ignored.
    pub fn status_counts(&self, ids: Option<&[String]>) -> StatusCounts {
        let mut counts = StatusCounts::default();
        match ids {
            Some(ids) => {
                let mut seen = HashSet::new();
                for id in ids {
                    if !seen.insert(id.as_str()) {
                        continue;
                    }
                    if let Some(run) = self.runs.get(id).filter(|run| !run.discarded) {
                        counts.add(run.status);
                    }
                }
            }
            None => {
                for run in self.runs.values().filter(|run| !run.discarded) {
                    counts.add(run.status);
                }
            }
        }
        counts
    }

    /// Status counts of live runs, per parameter set
    pub fn counts_by_parameter_set(&self) -> BTreeMap<String, StatusCounts> {
        let mut counts: BTreeMap<String, StatusCounts> = BTreeMap::new();
        for run in self.runs.values().filter(|run| !run.discarded) {
            counts
                .entry(run.parameter_set_id.clone())
                .or_default()
                .add(run.status);
        }
        counts
    }

    /// Seeds already used by runs of a parameter set
    pub fn seeds_for(&self, parameter_set_id: &str) -> HashSet<u32> {
        self.runs
            .values()
            .filter(|run| run.parameter_set_id == parameter_set_id)
            .map(|run| run.seed)
            .collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
