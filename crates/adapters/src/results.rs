// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result collaborator
//!
//! Job scripts leave `_status.json` (and optionally `_output.json`) in
//! `<results.dir>/<run_id>/` when they exit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fl_core::Run;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

const STATUS_FILE: &str = "_status.json";
const OUTPUT_FILE: &str = "_output.json";

/// Errors from result harvesting
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HarvestError {
    /// The job has not written its status yet
    #[error("results for run {0} are not ready")]
    NotReady(String),
    /// The job finished unsuccessfully or left unreadable results
    #[error("{0}")]
    Failed(String),
}

/// Collected outcome of a successful job
#[derive(Debug, Clone, PartialEq)]
pub struct Harvest {
    pub hostname: Option<String>,
    pub cpu_time: f64,
    pub real_time: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: serde_json::Value,
}

/// Harvests the results of a job that left the back end
#[async_trait]
pub trait ResultAdapter: Clone + Send + Sync + 'static {
    async fn harvest(&self, run: &Run) -> Result<Harvest, HarvestError>;
}

#[derive(Debug, Deserialize)]
struct StatusFile {
    rc: i32,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    cpu_time: f64,
    #[serde(default)]
    real_time: f64,
}

/// Results in `<dir>/<run_id>/`
#[derive(Clone)]
pub struct DirectoryResults {
    dir: PathBuf,
}

impl DirectoryResults {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ResultAdapter for DirectoryResults {
    async fn harvest(&self, run: &Run) -> Result<Harvest, HarvestError> {
        let run_dir = self.dir.join(&run.id);

        let raw = match tokio::fs::read_to_string(run_dir.join(STATUS_FILE)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HarvestError::NotReady(run.id.clone()))
            }
            Err(e) => return Err(HarvestError::Failed(format!("reading {}: {}", STATUS_FILE, e))),
        };
        let status: StatusFile = serde_json::from_str(&raw)
            .map_err(|e| HarvestError::Failed(format!("invalid {}: {}", STATUS_FILE, e)))?;

        if status.rc != 0 {
            return Err(HarvestError::Failed(format!(
                "job exited with code {}",
                status.rc
            )));
        }

        let result = match tokio::fs::read_to_string(run_dir.join(OUTPUT_FILE)).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| HarvestError::Failed(format!("invalid {}: {}", OUTPUT_FILE, e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                serde_json::Value::Object(serde_json::Map::new())
            }
            Err(e) => return Err(HarvestError::Failed(format!("reading {}: {}", OUTPUT_FILE, e))),
        };

        Ok(Harvest {
            hostname: status.hostname,
            cpu_time: status.cpu_time,
            real_time: status.real_time,
            started_at: status.started_at,
            finished_at: status.finished_at,
            result,
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeResults;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    #![cfg_attr(coverage_nightly, coverage(off))]

    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Fake results keyed by run id; unknown runs are not ready
    #[derive(Clone, Default)]
    pub struct FakeResults {
        outcomes: Arc<Mutex<HashMap<String, Result<Harvest, HarvestError>>>>,
        harvested: Arc<Mutex<Vec<String>>>,
    }

    impl FakeResults {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make a run's results available
        pub fn set_ready(&self, run_id: &str, harvest: Harvest) {
            self.outcomes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(run_id.to_string(), Ok(harvest));
        }

        /// Make harvesting a run fail
        pub fn set_failed(&self, run_id: &str, message: &str) {
            self.outcomes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(
                    run_id.to_string(),
                    Err(HarvestError::Failed(message.to_string())),
                );
        }

        /// Run ids passed to `harvest`, in order
        pub fn harvested(&self) -> Vec<String> {
            self.harvested
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }

    #[async_trait]
    impl ResultAdapter for FakeResults {
        async fn harvest(&self, run: &Run) -> Result<Harvest, HarvestError> {
            self.harvested
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(run.id.clone());
            self.outcomes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&run.id)
                .cloned()
                .unwrap_or_else(|| Err(HarvestError::NotReady(run.id.clone())))
        }
    }
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
