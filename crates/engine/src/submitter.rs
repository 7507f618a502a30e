// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submitter daemon
//!
//! Moves queued runs onto hosts. A run is first reserved against a host's
//! capacity under the store lock, then submitted remotely, then confirmed
//! with a guarded `created -> submitted` write. Any failure releases the
//! reservation and leaves the run queued for the next cycle.

use crate::capacity::HostCapacityManager;
use crate::command::{exec_checked, exec_with_timeout};
use crate::config::Config;
use crate::context::Cycle;
use crate::error::EngineError;
use async_trait::async_trait;
use fl_adapters::{JobScheduler, ScriptAdapter, ShellAdapter};
use fl_core::{Clock, Host, Operation, Reservation, Run, RunStatus, SubmitTarget, Transition};
use fl_storage::Store;
use std::collections::HashSet;

/// What one submitter cycle did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubmitSummary {
    pub submitted: usize,
    pub failed: usize,
    pub released_stale: usize,
}

/// Outcome of trying to reserve a slot for one run
enum Placement {
    Reserved(Box<Run>, Host),
    /// No host of the target has a free slot
    Full,
    /// The run changed under us (submitted, discarded or reserved elsewhere)
    Skipped,
}

pub struct Submitter<S, P, C> {
    config: Config,
    store: Store,
    shell: S,
    scripts: P,
    clock: C,
    holder: String,
}

impl<S, P, C> Submitter<S, P, C>
where
    S: ShellAdapter,
    P: ScriptAdapter,
    C: Clock,
{
    pub fn new(config: Config, store: Store, shell: S, scripts: P, clock: C) -> Self {
        Self {
            config,
            store,
            shell,
            scripts,
            clock,
            holder: format!("submitter-{}", std::process::id()),
        }
    }

    /// Override the reservation holder name
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// One pass over the queue
    pub async fn run_cycle(&mut self) -> Result<SubmitSummary, EngineError> {
        let mut summary = SubmitSummary {
            released_stale: self.release_stale()?,
            ..SubmitSummary::default()
        };

        let candidates: Vec<(String, SubmitTarget)> = self
            .store
            .refresh()?
            .pending_runs()
            .into_iter()
            .filter_map(|run| Some((run.id.clone(), run.submitted_to.clone()?)))
            .collect();
        tracing::debug!(candidates = candidates.len(), "submitter cycle");

        let mut full: HashSet<SubmitTarget> = HashSet::new();
        for (run_id, target) in candidates {
            if full.contains(&target) {
                continue;
            }
            match self.place(&run_id, &target).await {
                Ok(Some(true)) => summary.submitted += 1,
                Ok(Some(false)) => {
                    tracing::debug!(%target, "no capacity left");
                    full.insert(target);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(run_id, %target, error = %e, "submission failed");
                    summary.failed += 1;
                }
            }
        }

        if summary.submitted > 0 || summary.failed > 0 {
            tracing::info!(
                submitted = summary.submitted,
                failed = summary.failed,
                "submitter cycle done"
            );
        }
        Ok(summary)
    }

    /// Drop reservations whose holder never confirmed them
    fn release_stale(&mut self) -> Result<usize, EngineError> {
        let now = self.clock.now();
        let timeout = self.config.submitter.reservation_timeout;
        self.store.transact(|state| {
            let ops: Vec<Operation> = state
                .runs_with_status(RunStatus::Created)
                .filter_map(|run| {
                    let reservation = run.reservation.as_ref()?;
                    reservation.is_stale(now, timeout).then(|| Operation::RunRelease {
                        id: run.id.clone(),
                        holder: reservation.holder.clone(),
                    })
                })
                .collect();
            for op in &ops {
                tracing::warn!(run_id = op.run_id(), "releasing stale reservation");
            }
            let count = ops.len();
            Ok::<_, EngineError>((ops, count))
        })
    }

    /// Submit one run: `Some(true)` when submitted, `Some(false)` when its
    /// target is full, `None` when the run no longer needs submitting
    async fn place(
        &mut self,
        run_id: &str,
        target: &SubmitTarget,
    ) -> Result<Option<bool>, EngineError> {
        let (run, host) = match self.reserve(run_id, target)? {
            Placement::Reserved(run, host) => (run, host),
            Placement::Full => return Ok(Some(false)),
            Placement::Skipped => return Ok(None),
        };

        let job_id = match self.submit_remote(&run, &host).await {
            Ok(job_id) => job_id,
            Err(e) => {
                self.release(run_id);
                return Err(e);
            }
        };

        let confirm = Operation::RunTransition {
            id: run_id.to_string(),
            from: RunStatus::Created,
            transition: Transition::Submit {
                job_id: job_id.clone(),
                host_id: host.id.clone(),
                at: self.clock.now(),
            },
        };
        if let Err(e) = self.store.commit(confirm) {
            // The job is live remotely but the run no longer wants it
            tracing::warn!(
                run_id,
                job_id,
                error = %e,
                "run changed during submit, cancelling job"
            );
            self.cancel_orphan(&host, &job_id).await;
            return Err(e.into());
        }

        tracing::info!(run_id, host = %host.id, job_id, "submitted");
        Ok(Some(true))
    }

    /// Reserve a slot for the run if it is still queued and capacity allows
    fn reserve(&mut self, run_id: &str, target: &SubmitTarget) -> Result<Placement, EngineError> {
        let now = self.clock.now();
        let config = &self.config;
        let holder = &self.holder;
        self.store.transact(|state| {
            let timeout = config.submitter.reservation_timeout;
            let run = match state.runs.get(run_id) {
                Some(run) if is_waiting(run) && !run.is_reserved(now, timeout) => run,
                _ => return Ok((Vec::new(), Placement::Skipped)),
            };
            let host = match HostCapacityManager::new(config).select_host(state, target, now)? {
                Some(host) => host,
                None => return Ok((Vec::new(), Placement::Full)),
            };
            let op = Operation::RunReserve {
                id: run.id.clone(),
                reservation: Reservation {
                    holder: holder.clone(),
                    host_id: host.id.clone(),
                    reserved_at: now,
                },
            };
            let placement = Placement::Reserved(Box::new(run.clone()), host.clone());
            Ok::<_, EngineError>((vec![op], placement))
        })
    }

    async fn submit_remote(&self, run: &Run, host: &Host) -> Result<String, EngineError> {
        let scheduler = self.config.scheduler_for(host)?;
        let script = self.scripts.script_path(run, host).await?;
        let command = scheduler.submit_command(&script);
        let output = exec_checked(
            &self.shell,
            host,
            &command,
            self.config.submitter.command_timeout,
        )
        .await?;
        scheduler
            .parse_submit_output(&output.stdout)
            .ok_or_else(|| EngineError::NoJobId {
                host: host.id.clone(),
                stdout: output.stdout.clone(),
            })
    }

    fn release(&mut self, run_id: &str) {
        let op = Operation::RunRelease {
            id: run_id.to_string(),
            holder: self.holder.clone(),
        };
        if let Err(e) = self.store.commit(op) {
            tracing::warn!(run_id, error = %e, "failed to release reservation");
        }
    }

    async fn cancel_orphan(&self, host: &Host, job_id: &str) {
        let command = match self.config.scheduler_for(host) {
            Ok(scheduler) => scheduler.cancel_command(job_id),
            Err(_) => return,
        };
        if let Err(e) = exec_with_timeout(
            &self.shell,
            host,
            &command,
            self.config.submitter.command_timeout,
        )
        .await
        {
            tracing::error!(
                host = %host.id,
                job_id,
                error = %e,
                "failed to cancel orphaned job"
            );
        }
    }
}

fn is_waiting(run: &Run) -> bool {
    run.status == RunStatus::Created && !run.discarded
}

#[async_trait]
impl<S, P, C> Cycle for Submitter<S, P, C>
where
    S: ShellAdapter,
    P: ScriptAdapter,
    C: Clock + 'static,
{
    async fn tick(&mut self) -> Result<(), EngineError> {
        self.run_cycle().await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "submitter_tests.rs"]
mod tests;
