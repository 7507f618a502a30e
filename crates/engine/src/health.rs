// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service daemon: keeps the status-count cache fresh

use crate::config::Config;
use crate::context::Cycle;
use crate::error::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fl_core::Clock;
use fl_storage::{StatusCounts, Store};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Snapshot of run counts written by the service daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCache {
    pub updated_at: DateTime<Utc>,
    pub overall: StatusCounts,
    pub parameter_sets: BTreeMap<String, StatusCounts>,
}

impl StatusCache {
    /// Read a cache file; `None` if the service has not written one yet
    pub fn load(path: &Path) -> Result<Option<Self>, EngineError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write atomically: readers never see a partial file
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

pub struct HealthMonitor<C> {
    config: Config,
    store: Store,
    clock: C,
}

impl<C: Clock> HealthMonitor<C> {
    pub fn new(config: Config, store: Store, clock: C) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }

    /// Recompute and persist the status counts
    pub fn run_cycle(&mut self) -> Result<StatusCache, EngineError> {
        let state = self.store.refresh()?;
        let cache = StatusCache {
            updated_at: self.clock.now(),
            overall: state.status_counts(None),
            parameter_sets: state.counts_by_parameter_set(),
        };
        let path = self.config.cache_path();
        cache.save(&path)?;
        tracing::debug!(
            path = %path.display(),
            total = cache.overall.total,
            parameter_sets = cache.parameter_sets.len(),
            "status cache refreshed"
        );
        Ok(cache)
    }
}

#[async_trait]
impl<C: Clock + 'static> Cycle for HealthMonitor<C> {
    async fn tick(&mut self) -> Result<(), EngineError> {
        self.run_cycle().map(|_| ())
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
