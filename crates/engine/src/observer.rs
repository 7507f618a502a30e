// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observer daemon
//!
//! Polls the back end for every submitted or running run and advances the
//! run accordingly. Each host is queried once per cycle with its bulk status
//! command; per-job queries are the fallback when that fails.

use crate::command::exec_with_timeout;
use crate::config::Config;
use crate::context::Cycle;
use crate::error::EngineError;
use async_trait::async_trait;
use fl_adapters::{
    Harvest, HarvestError, JobScheduler, ResultAdapter, SchedulerAdapter, ShellAdapter,
};
use fl_core::{Clock, Host, Operation, RemoteJobState, Run, RunStatus, Transition};
use fl_storage::Store;
use std::collections::BTreeMap;

/// What one observer cycle did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ObserveSummary {
    pub polled: usize,
    pub started: usize,
    pub finished: usize,
    pub failed: usize,
    pub unknown: usize,
}

/// Effect of one poll on one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observed {
    Unchanged,
    Started,
    Finished,
    Failed,
    Unknown,
}

pub struct Observer<S, R, C> {
    config: Config,
    store: Store,
    shell: S,
    results: R,
    clock: C,
}

impl<S, R, C> Observer<S, R, C>
where
    S: ShellAdapter,
    R: ResultAdapter,
    C: Clock,
{
    pub fn new(config: Config, store: Store, shell: S, results: R, clock: C) -> Self {
        Self {
            config,
            store,
            shell,
            results,
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Poll every outstanding run once
    pub async fn run_cycle(&mut self) -> Result<ObserveSummary, EngineError> {
        let mut by_host: BTreeMap<String, Vec<Run>> = BTreeMap::new();
        for run in self.store.refresh()?.runs.values() {
            if run.discarded || !run.status.is_outstanding() {
                continue;
            }
            if let Some(host_id) = &run.host_id {
                by_host.entry(host_id.clone()).or_default().push(run.clone());
            }
        }

        let mut summary = ObserveSummary::default();
        for (host_id, runs) in by_host {
            let Some(host) = self.config.host(&host_id).cloned() else {
                tracing::warn!(
                    host = %host_id,
                    runs = runs.len(),
                    "host no longer configured"
                );
                continue;
            };
            let scheduler = match self.config.scheduler_for(&host) {
                Ok(scheduler) => scheduler,
                Err(e) => {
                    tracing::error!(host = %host_id, error = %e, "cannot poll host");
                    continue;
                }
            };

            let bulk = self.bulk_status(&host, &scheduler).await;
            for run in runs {
                summary.polled += 1;
                match self.observe(&run, &host, &scheduler, bulk.as_deref()).await {
                    Ok(Observed::Unchanged) => {}
                    Ok(Observed::Started) => summary.started += 1,
                    Ok(Observed::Finished) => summary.finished += 1,
                    Ok(Observed::Failed) => summary.failed += 1,
                    Ok(Observed::Unknown) => summary.unknown += 1,
                    Err(e) if is_conflict(&e) => {
                        tracing::debug!(
                            run_id = %run.id,
                            error = %e,
                            "run changed concurrently"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            run_id = %run.id,
                            host = %host_id,
                            error = %e,
                            "observation failed"
                        );
                    }
                }
            }
        }

        tracing::debug!(
            polled = summary.polled,
            started = summary.started,
            finished = summary.finished,
            failed = summary.failed,
            unknown = summary.unknown,
            "observer cycle done"
        );
        Ok(summary)
    }

    /// Bulk listing for a host, or `None` when it could not be obtained
    async fn bulk_status(&self, host: &Host, scheduler: &SchedulerAdapter) -> Option<String> {
        let command = scheduler.all_status_command();
        let limit = self.config.observer.command_timeout;
        match exec_with_timeout(&self.shell, host, &command, limit).await {
            Ok(output) if output.success() || !output.stdout.trim().is_empty() => {
                Some(output.stdout)
            }
            Ok(output) => {
                tracing::warn!(
                    host = %host.id,
                    code = ?output.code,
                    "bulk status failed, polling jobs one by one"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    host = %host.id,
                    error = %e,
                    "bulk status failed, polling jobs one by one"
                );
                None
            }
        }
    }

    /// Status text for one job; empty when the query fails
    async fn job_status(
        &self,
        host: &Host,
        scheduler: &SchedulerAdapter,
        job_id: &str,
    ) -> String {
        let command = scheduler.status_command(job_id);
        let limit = self.config.observer.command_timeout;
        match exec_with_timeout(&self.shell, host, &command, limit).await {
            Ok(output) => output.stdout,
            Err(e) => {
                tracing::warn!(host = %host.id, job_id, error = %e, "status query failed");
                String::new()
            }
        }
    }

    async fn observe(
        &mut self,
        run: &Run,
        host: &Host,
        scheduler: &SchedulerAdapter,
        bulk: Option<&str>,
    ) -> Result<Observed, EngineError> {
        let job_id = run.job_id.as_deref().unwrap_or_default();
        let raw = match bulk {
            Some(all) => scheduler.job_status_lines(all, job_id),
            None => self.job_status(host, scheduler, job_id).await,
        };
        let remote = scheduler.parse_remote_status(&raw);
        tracing::debug!(run_id = %run.id, job_id, %remote, "polled");

        match remote {
            RemoteJobState::Submitted => {
                self.reset_unknown(run)?;
                Ok(Observed::Unchanged)
            }
            RemoteJobState::Running => {
                if run.status == RunStatus::Running {
                    self.reset_unknown(run)?;
                    return Ok(Observed::Unchanged);
                }
                let start = Transition::Start {
                    hostname: host.name.clone(),
                    at: self.clock.now(),
                };
                self.transition(run, start)?;
                tracing::info!(run_id = %run.id, host = %host.id, "running");
                Ok(Observed::Started)
            }
            RemoteJobState::Includable => match self.results.harvest(run).await {
                Ok(harvest) => self.finish(run, host, harvest),
                Err(HarvestError::NotReady(_)) => {
                    self.fail(run, host, "job completed without writing results")
                }
                Err(HarvestError::Failed(message)) => self.fail(run, host, &message),
            },
            RemoteJobState::Unknown => match self.results.harvest(run).await {
                Ok(harvest) => self.finish(run, host, harvest),
                Err(HarvestError::Failed(message)) => self.fail(run, host, &message),
                Err(HarvestError::NotReady(_)) => self.unknown(run, host),
            },
        }
    }

    fn unknown(&mut self, run: &Run, host: &Host) -> Result<Observed, EngineError> {
        let count = run.unknown_polls + 1;
        let limit = self.config.observer.unknown_poll_limit;
        if count > limit {
            let error = format!("job state unknown for {} consecutive polls", count);
            return self.fail(run, host, &error);
        }
        self.store.commit(Operation::RunUnknownObserved {
            id: run.id.clone(),
            status: run.status,
            count,
        })?;
        tracing::info!(run_id = %run.id, count, limit, "job state unknown");
        Ok(Observed::Unknown)
    }

    fn finish(
        &mut self,
        run: &Run,
        host: &Host,
        harvest: Harvest,
    ) -> Result<Observed, EngineError> {
        let now = self.clock.now();
        let hostname = harvest
            .hostname
            .or_else(|| run.hostname.clone())
            .unwrap_or_else(|| host.name.clone());
        let finish = Transition::Finish {
            hostname,
            cpu_time: harvest.cpu_time,
            real_time: harvest.real_time,
            result: harvest.result,
            started_at: harvest.started_at,
            finished_at: harvest.finished_at.unwrap_or(now),
            included_at: now,
        };
        self.transition(run, finish)?;
        tracing::info!(run_id = %run.id, host = %host.id, "finished");
        Ok(Observed::Finished)
    }

    fn fail(&mut self, run: &Run, host: &Host, error: &str) -> Result<Observed, EngineError> {
        let fail = Transition::Fail {
            hostname: run.hostname.clone().unwrap_or_else(|| host.name.clone()),
            error: error.to_string(),
            started_at: None,
            included_at: self.clock.now(),
        };
        self.transition(run, fail)?;
        tracing::warn!(run_id = %run.id, host = %host.id, error, "failed");
        Ok(Observed::Failed)
    }

    fn transition(&mut self, run: &Run, transition: Transition) -> Result<(), EngineError> {
        self.store.commit(Operation::RunTransition {
            id: run.id.clone(),
            from: run.status,
            transition,
        })?;
        Ok(())
    }

    fn reset_unknown(&mut self, run: &Run) -> Result<(), EngineError> {
        if run.unknown_polls > 0 {
            self.store.commit(Operation::RunUnknownObserved {
                id: run.id.clone(),
                status: run.status,
                count: 0,
            })?;
        }
        Ok(())
    }
}

fn is_conflict(e: &EngineError) -> bool {
    matches!(e, EngineError::Store(store) if store.is_conflict())
}

#[async_trait]
impl<S, R, C> Cycle for Observer<S, R, C>
where
    S: ShellAdapter,
    R: ResultAdapter,
    C: Clock + 'static,
{
    async fn tick(&mut self) -> Result<(), EngineError> {
        self.run_cycle().await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
