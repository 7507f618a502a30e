// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host capacity accounting
//!
//! A host's load is its submitted and running runs plus live reservations.
//! It is recomputed from the store on every call; nothing is cached.

use crate::config::Config;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use fl_core::{Host, SubmitTarget};
use fl_storage::MaterializedState;
use serde::Serialize;

/// Load of one host at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostUsage {
    pub host_id: String,
    pub max_num_jobs: u32,
    pub occupied: usize,
}

impl HostUsage {
    pub fn available(&self) -> usize {
        (self.max_num_jobs as usize).saturating_sub(self.occupied)
    }
}

/// Answers how many more runs a host or host group can take
pub struct HostCapacityManager<'a> {
    config: &'a Config,
}

impl<'a> HostCapacityManager<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn usage(&self, state: &MaterializedState, host: &Host, now: DateTime<Utc>) -> HostUsage {
        HostUsage {
            host_id: host.id.clone(),
            max_num_jobs: host.max_num_jobs,
            occupied: state.occupied_slots(
                &host.id,
                now,
                self.config.submitter.reservation_timeout,
            ),
        }
    }

    /// Usage of every configured host, in config order
    pub fn all_usage(&self, state: &MaterializedState, now: DateTime<Utc>) -> Vec<HostUsage> {
        self.config
            .hosts
            .iter()
            .map(|host| self.usage(state, host, now))
            .collect()
    }

    /// Free slots across a target: the host itself, or the sum over a group
    pub fn available(
        &self,
        state: &MaterializedState,
        target: &SubmitTarget,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        Ok(self
            .members(target)?
            .into_iter()
            .map(|host| self.usage(state, host, now).available())
            .sum())
    }

    /// Host to place the next run of `target` on, if any has a free slot
    ///
    /// For a group this is the member with the most free slots; ties go to
    /// the member listed first.
    pub fn select_host(
        &self,
        state: &MaterializedState,
        target: &SubmitTarget,
        now: DateTime<Utc>,
    ) -> Result<Option<&'a Host>, EngineError> {
        let mut best: Option<(&'a Host, usize)> = None;
        for host in self.members(target)? {
            let free = self.usage(state, host, now).available();
            if free > 0 && best.is_none_or(|(_, most)| free > most) {
                best = Some((host, free));
            }
        }
        Ok(best.map(|(host, _)| host))
    }

    fn members(&self, target: &SubmitTarget) -> Result<Vec<&'a Host>, EngineError> {
        match target {
            SubmitTarget::Host(id) => self
                .config
                .host(id)
                .map(|host| vec![host])
                .ok_or_else(|| EngineError::HostNotFound(id.clone())),
            SubmitTarget::HostGroup(id) => {
                let group = self
                    .config
                    .host_group(id)
                    .ok_or_else(|| EngineError::HostGroupNotFound(id.clone()))?;
                group
                    .hosts
                    .iter()
                    .map(|host_id| {
                        self.config
                            .host(host_id)
                            .ok_or_else(|| EngineError::HostNotFound(host_id.clone()))
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
#[path = "capacity_tests.rs"]
mod tests;
