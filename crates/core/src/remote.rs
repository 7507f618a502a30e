// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler-reported job state

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a submitted job as reported by its back end.
///
/// Distinct from [`crate::RunStatus`]: `Includable` only says the job has
/// exited and its output can be collected. Whether the run finished or failed
/// is decided after harvesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteJobState {
    Unknown,
    Submitted,
    Running,
    Includable,
}

impl fmt::Display for RemoteJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteJobState::Unknown => "unknown",
            RemoteJobState::Submitted => "submitted",
            RemoteJobState::Running => "running",
            RemoteJobState::Includable => "includable",
        };
        f.write_str(name)
    }
}
