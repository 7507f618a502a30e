// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log

use crate::run::{Reservation, Run, RunStatus, Transition};
use serde::{Deserialize, Serialize};

/// Operations that can be persisted to the WAL
///
/// Every mutation of an existing run names the status it expects to find.
/// The store rejects the operation when the current record disagrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Register a new run in `created` status
    RunCreate { run: Run },

    /// Move a run through its state machine
    RunTransition {
        id: String,
        from: RunStatus,
        transition: Transition,
    },

    /// Hold a capacity slot on a host for a created run
    RunReserve { id: String, reservation: Reservation },

    /// Drop a reservation held by `holder`
    RunRelease { id: String, holder: String },

    /// Record consecutive `unknown` polls of an outstanding run
    RunUnknownObserved {
        id: String,
        status: RunStatus,
        count: u32,
    },

    /// Take a run out of scheduling for good
    RunDiscard { id: String, from: RunStatus },
}

impl Operation {
    /// Id of the run this operation touches
    pub fn run_id(&self) -> &str {
        match self {
            Operation::RunCreate { run } => &run.id,
            Operation::RunTransition { id, .. }
            | Operation::RunReserve { id, .. }
            | Operation::RunRelease { id, .. }
            | Operation::RunUnknownObserved { id, .. }
            | Operation::RunDiscard { id, .. } => id,
        }
    }

    /// Status the run must be in for this operation to apply
    pub fn expected_status(&self) -> Option<RunStatus> {
        match self {
            Operation::RunCreate { .. } => None,
            Operation::RunTransition { from, .. } | Operation::RunDiscard { from, .. } => {
                Some(*from)
            }
            Operation::RunReserve { .. } | Operation::RunRelease { .. } => {
                Some(RunStatus::Created)
            }
            Operation::RunUnknownObserved { status, .. } => Some(*status),
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
