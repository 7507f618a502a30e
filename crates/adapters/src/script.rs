// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job script collaborator
//!
//! Scripts are generated outside Flotilla. The adapter only locates them.

use async_trait::async_trait;
use fl_core::{Host, Run};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from script lookup
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("no job script for run {run_id} at {path}")]
    Missing { run_id: String, path: PathBuf },
}

/// Locates the executable script for a run on a host
#[async_trait]
pub trait ScriptAdapter: Clone + Send + Sync + 'static {
    async fn script_path(&self, run: &Run, host: &Host) -> Result<String, ScriptError>;
}

/// Scripts prepared as `<dir>/<run_id>.sh` on a filesystem shared with hosts
#[derive(Clone)]
pub struct DirectoryScripts {
    dir: PathBuf,
}

impl DirectoryScripts {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ScriptAdapter for DirectoryScripts {
    async fn script_path(&self, run: &Run, _host: &Host) -> Result<String, ScriptError> {
        let path = self.dir.join(format!("{}.sh", run.id));
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path.display().to_string()),
            _ => Err(ScriptError::Missing {
                run_id: run.id.clone(),
                path,
            }),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeScripts;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    #![cfg_attr(coverage_nightly, coverage(off))]

    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Fake scripts at `/scripts/<run_id>.sh`, optionally missing per run
    #[derive(Clone, Default)]
    pub struct FakeScripts {
        missing: Arc<Mutex<HashSet<String>>>,
    }

    impl FakeScripts {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make lookups for a run fail
        pub fn set_missing(&self, run_id: &str) {
            self.missing
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(run_id.to_string());
        }
    }

    #[async_trait]
    impl ScriptAdapter for FakeScripts {
        async fn script_path(&self, run: &Run, _host: &Host) -> Result<String, ScriptError> {
            let path = PathBuf::from(format!("/scripts/{}.sh", run.id));
            let missing = self
                .missing
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(&run.id);
            if missing {
                return Err(ScriptError::Missing {
                    run_id: run.id.clone(),
                    path,
                });
            }
            Ok(path.display().to_string())
        }
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
