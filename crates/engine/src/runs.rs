// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing run operations: create, cancel, discard and run-id files

use crate::command::exec_with_timeout;
use crate::config::Config;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use fl_adapters::{JobScheduler, ShellAdapter};
use fl_core::{IdGen, Operation, Priority, Run, RunStatus, SubmitTarget};
use fl_storage::Store;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Attempts at drawing an unused seed before giving up
const SEED_ATTEMPTS: usize = 1000;

/// Most runs a single create request may ask for
pub const MAX_RUNS_PER_REQUEST: usize = 10_000;

/// Request to create runs for one parameter set
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRuns {
    pub parameter_set_id: String,
    pub count: usize,
    /// Seed for the first run; the rest are drawn at random
    pub seed: Option<u32>,
    pub mpi_procs: u32,
    pub omp_threads: u32,
    pub priority: Priority,
    pub target: Option<SubmitTarget>,
    pub host_parameters: BTreeMap<String, String>,
}

impl CreateRuns {
    pub fn new(parameter_set_id: impl Into<String>, count: usize) -> Self {
        Self {
            parameter_set_id: parameter_set_id.into(),
            count,
            seed: None,
            mpi_procs: 1,
            omp_threads: 1,
            priority: Priority::Normal,
            target: None,
            host_parameters: BTreeMap::new(),
        }
    }
}

/// Create runs in one store transaction
///
/// With `dry_run` every check runs and the runs are returned, but nothing
/// is written.
pub fn create_runs<I: IdGen>(
    store: &mut Store,
    config: &Config,
    request: &CreateRuns,
    id_gen: &I,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<Vec<Run>, EngineError> {
    check_request(request)?;
    let host_parameters = resolve_host_parameters(config, request)?;

    let runs = store.transact(|state| {
        let mut used = state.seeds_for(&request.parameter_set_id);
        let runs = new_runs(request, request.count, &host_parameters, &mut used, id_gen, now)?;
        Ok::<_, EngineError>((create_ops(&runs, dry_run), runs))
    })?;

    tracing::info!(
        parameter_set_id = %request.parameter_set_id,
        count = runs.len(),
        dry_run,
        "created runs"
    );
    Ok(runs)
}

/// Runs of a parameter set after topping it up to a target count
#[derive(Debug, Clone, PartialEq)]
pub struct ToppedUp {
    /// Live runs that already counted toward the target, oldest first
    pub existing: Vec<Run>,
    pub created: Vec<Run>,
}

impl ToppedUp {
    /// Existing then created runs; never more than the target
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.existing.iter().chain(&self.created)
    }
}

/// Bring a parameter set up to `request.count` live runs
///
/// Existing live runs count toward the target; only the shortfall is created.
pub fn top_up_runs<I: IdGen>(
    store: &mut Store,
    config: &Config,
    request: &CreateRuns,
    id_gen: &I,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<ToppedUp, EngineError> {
    check_request(request)?;
    let host_parameters = resolve_host_parameters(config, request)?;

    let topped_up = store.transact(|state| {
        let mut existing: Vec<Run> = state
            .runs
            .values()
            .filter(|run| !run.discarded && run.parameter_set_id == request.parameter_set_id)
            .cloned()
            .collect();
        existing.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        existing.truncate(request.count);

        let missing = request.count - existing.len();
        let mut used = state.seeds_for(&request.parameter_set_id);
        let created = new_runs(request, missing, &host_parameters, &mut used, id_gen, now)?;
        Ok::<_, EngineError>((
            create_ops(&created, dry_run),
            ToppedUp { existing, created },
        ))
    })?;

    tracing::info!(
        parameter_set_id = %request.parameter_set_id,
        target = request.count,
        existing = topped_up.existing.len(),
        created = topped_up.created.len(),
        dry_run,
        "topped up runs"
    );
    Ok(topped_up)
}

/// Job settings shared by every parameter set of a batch: `job_parameters.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobParameters {
    pub host_id: Option<String>,
    pub host_group_id: Option<String>,
    pub host_parameters: BTreeMap<String, String>,
    pub mpi_procs: Option<u32>,
    pub omp_threads: Option<u32>,
    pub priority: Option<Priority>,
}

impl JobParameters {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Request for one parameter set of the batch
    pub fn request(&self, parameter_set_id: &str, count: usize) -> CreateRuns {
        let target = match (&self.host_id, &self.host_group_id) {
            (Some(host), _) => Some(SubmitTarget::Host(host.clone())),
            (None, Some(group)) => Some(SubmitTarget::HostGroup(group.clone())),
            (None, None) => None,
        };
        let defaults = CreateRuns::new(parameter_set_id, count);
        CreateRuns {
            mpi_procs: self.mpi_procs.unwrap_or(defaults.mpi_procs),
            omp_threads: self.omp_threads.unwrap_or(defaults.omp_threads),
            priority: self.priority.unwrap_or(defaults.priority),
            target,
            host_parameters: self.host_parameters.clone(),
            ..defaults
        }
    }
}

/// Entry of a parameter-set file: `[{"parameter_set_id": "..."}, ...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSetIdEntry {
    pub parameter_set_id: String,
}

pub fn read_parameter_set_ids(path: &Path) -> Result<Vec<String>, EngineError> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<ParameterSetIdEntry> = serde_json::from_str(&content)?;
    Ok(entries
        .into_iter()
        .map(|entry| entry.parameter_set_id)
        .collect())
}

/// Parameter sets to top up with shared job settings
#[derive(Debug, Clone, PartialEq)]
pub struct TopUpBatch {
    pub parameter_set_ids: Vec<String>,
    pub job: JobParameters,
    /// Target number of live runs per parameter set
    pub count: usize,
}

/// Outcome of topping up a batch of parameter sets
#[derive(Debug)]
pub struct BatchOutcome {
    /// Existing and created runs of every parameter set processed so far
    pub runs: Vec<Run>,
    pub created: usize,
    /// The error that stopped the batch, if any
    pub error: Option<EngineError>,
}

/// Top up each parameter set in order, stopping at the first error
///
/// Parameter sets processed before the error keep their runs.
pub fn top_up_batch<I: IdGen>(
    store: &mut Store,
    config: &Config,
    batch: &TopUpBatch,
    id_gen: &I,
    now: DateTime<Utc>,
    dry_run: bool,
) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        runs: Vec::new(),
        created: 0,
        error: None,
    };
    for parameter_set_id in &batch.parameter_set_ids {
        let request = batch.job.request(parameter_set_id, batch.count);
        match top_up_runs(store, config, &request, id_gen, now, dry_run) {
            Ok(topped_up) => {
                outcome.created += topped_up.created.len();
                outcome.runs.extend(topped_up.runs().cloned());
            }
            Err(e) => {
                outcome.error = Some(e);
                break;
            }
        }
    }
    outcome
}

fn check_request(request: &CreateRuns) -> Result<(), EngineError> {
    let id = &request.parameter_set_id;
    if id.is_empty() || id.trim() != id {
        return Err(EngineError::InvalidParameterSetId(id.clone()));
    }
    if request.count > MAX_RUNS_PER_REQUEST {
        return Err(EngineError::TooManyRuns {
            requested: request.count,
            limit: MAX_RUNS_PER_REQUEST,
        });
    }
    Ok(())
}

fn new_runs<I: IdGen>(
    request: &CreateRuns,
    count: usize,
    host_parameters: &BTreeMap<String, String>,
    used: &mut HashSet<u32>,
    id_gen: &I,
    now: DateTime<Utc>,
) -> Result<Vec<Run>, EngineError> {
    let mut runs = Vec::with_capacity(count);
    for i in 0..count {
        let seed = match request.seed {
            Some(seed) if i == 0 => {
                if !used.insert(seed) {
                    return Err(EngineError::DuplicateSeed {
                        parameter_set_id: request.parameter_set_id.clone(),
                        seed,
                    });
                }
                seed
            }
            _ => draw_seed(id_gen, used, &request.parameter_set_id)?,
        };

        let mut run = Run::new(id_gen.next(), &request.parameter_set_id, seed, now)
            .with_priority(request.priority)
            .with_resources(request.mpi_procs, request.omp_threads)
            .with_host_parameters(host_parameters.clone());
        if let Some(target) = &request.target {
            run = run.with_target(target.clone());
        }
        runs.push(run);
    }
    Ok(runs)
}

fn create_ops(runs: &[Run], dry_run: bool) -> Vec<Operation> {
    if dry_run {
        return Vec::new();
    }
    runs.iter()
        .map(|run| Operation::RunCreate { run: run.clone() })
        .collect()
}

fn resolve_host_parameters(
    config: &Config,
    request: &CreateRuns,
) -> Result<BTreeMap<String, String>, EngineError> {
    match &request.target {
        Some(SubmitTarget::Host(id)) => {
            let host = config
                .host(id)
                .ok_or_else(|| EngineError::HostNotFound(id.clone()))?;
            Ok(host.validate_parameters(&request.host_parameters)?)
        }
        Some(SubmitTarget::HostGroup(id)) => {
            config
                .host_group(id)
                .ok_or_else(|| EngineError::HostGroupNotFound(id.clone()))?;
            if !request.host_parameters.is_empty() {
                return Err(EngineError::HostParametersOnGroup(id.clone()));
            }
            Ok(BTreeMap::new())
        }
        None => Ok(request.host_parameters.clone()),
    }
}

fn draw_seed<I: IdGen>(
    id_gen: &I,
    used: &mut HashSet<u32>,
    parameter_set_id: &str,
) -> Result<u32, EngineError> {
    (0..SEED_ATTEMPTS)
        .map(|_| id_gen.seed())
        .find(|seed| used.insert(*seed))
        .ok_or_else(|| EngineError::SeedsExhausted(parameter_set_id.to_string()))
}

/// Look up a live run by id or unique prefix
pub fn find_run(store: &mut Store, id: &str) -> Result<Run, EngineError> {
    store
        .refresh()?
        .get_run(id)
        .filter(|run| !run.discarded)
        .cloned()
        .ok_or_else(|| EngineError::RunNotFound(id.to_string()))
}

/// Cancel a run
///
/// Queued runs are simply discarded. Outstanding runs first get the
/// scheduler's cancel command on their host; the run is discarded only if
/// that command could be executed.
pub async fn cancel_run<S: ShellAdapter>(
    store: &mut Store,
    config: &Config,
    shell: &S,
    id: &str,
) -> Result<Run, EngineError> {
    let run = find_run(store, id)?;
    if run.status.is_terminal() {
        return Err(EngineError::NotCancellable {
            id: run.id,
            status: run.status,
        });
    }

    if run.status.is_outstanding() {
        let host_id = run.host_id.clone().unwrap_or_default();
        let host = config
            .host(&host_id)
            .ok_or(EngineError::HostNotFound(host_id))?;
        let scheduler = config.scheduler_for(host)?;
        let job_id = run.job_id.as_deref().unwrap_or_default();
        let command = scheduler.cancel_command(job_id);
        let output =
            exec_with_timeout(shell, host, &command, config.observer.command_timeout).await?;
        if !output.success() {
            // The job may already be gone; the run is discarded regardless
            tracing::warn!(
                run_id = %run.id,
                job_id,
                code = ?output.code,
                stderr = %output.stderr.trim(),
                "cancel command exited unsuccessfully"
            );
        }
    }

    discard(store, run)
}

/// Soft-delete a run, guarded on the status seen now
pub fn discard_run(store: &mut Store, id: &str) -> Result<Run, EngineError> {
    let run = find_run(store, id)?;
    discard(store, run)
}

fn discard(store: &mut Store, run: Run) -> Result<Run, EngineError> {
    store.commit(Operation::RunDiscard {
        id: run.id.clone(),
        from: run.status,
    })?;
    tracing::info!(run_id = %run.id, status = %run.status, "discarded run");
    Ok(Run {
        discarded: true,
        ..run
    })
}

/// Entry of a run-id file: `[{"run_id": "..."}, ...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdEntry {
    pub run_id: String,
}

pub fn read_run_ids(path: &Path) -> Result<Vec<String>, EngineError> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<RunIdEntry> = serde_json::from_str(&content)?;
    Ok(entries.into_iter().map(|entry| entry.run_id).collect())
}

pub fn write_run_ids(path: &Path, runs: &[Run]) -> Result<(), EngineError> {
    let entries: Vec<RunIdEntry> = runs
        .iter()
        .map(|run| RunIdEntry {
            run_id: run.id.clone(),
        })
        .collect();
    std::fs::write(path, serde_json::to_string_pretty(&entries)? + "\n")?;
    Ok(())
}

/// Live runs, optionally limited to one status, oldest first
pub fn list_runs(store: &mut Store, status: Option<RunStatus>) -> Result<Vec<Run>, EngineError> {
    let mut runs: Vec<Run> = store
        .refresh()?
        .runs
        .values()
        .filter(|run| !run.discarded && status.is_none_or(|s| run.status == s))
        .cloned()
        .collect();
    runs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(runs)
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
