// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fl run` - create, inspect, cancel and count runs

use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::{Args, Subcommand};
use fl_adapters::{SystemShell, TracedShell};
use fl_core::{Clock, Priority, Run, RunStatus, SystemClock, UuidIdGen};
use fl_engine::runs::{
    cancel_run, create_runs, discard_run, find_run, list_runs, read_parameter_set_ids,
    read_run_ids, top_up_batch, write_run_ids, JobParameters, TopUpBatch,
};
use fl_engine::{Config, CreateRuns};
use fl_storage::Store;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    #[command(subcommand)]
    pub command: RunCommand,
}

#[derive(Subcommand)]
pub enum RunCommand {
    /// Create runs for a parameter set, or top up a batch of parameter sets
    Create(CreateArgs),
    /// List runs
    List {
        /// Only runs in this status
        #[arg(long)]
        status: Option<RunStatus>,
    },
    /// Show details of a run
    Show {
        /// Run ID
        id: String,
    },
    /// Cancel a run, killing its job if it has one
    Cancel {
        /// Run ID
        id: String,
    },
    /// Discard a run without touching its job
    Discard {
        /// Run ID
        id: String,
    },
    /// Print status counts of the runs listed in a run-id file, as JSON
    Status {
        /// JSON file of `[{"run_id": ...}]`
        #[arg(long)]
        run_ids: PathBuf,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    /// Parameter set the runs belong to
    #[arg(long, required_unless_present = "parameter_sets")]
    pub parameter_set: Option<String>,

    /// JSON file of `[{"parameter_set_id": ...}]`; tops each one up to `-n` live runs
    #[arg(long, conflicts_with = "parameter_set")]
    pub parameter_sets: Option<PathBuf>,

    /// JSON job settings for `--parameter-sets`, in place of the flags below
    #[arg(
        long,
        requires = "parameter_sets",
        conflicts_with_all = ["host", "host_group", "host_params", "mpi_procs", "omp_threads", "priority"]
    )]
    pub job_parameters: Option<PathBuf>,

    /// Number of runs, or the target count with `--parameter-sets`
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,

    /// Seed of the first run; others are drawn at random
    #[arg(long, conflicts_with = "parameter_sets")]
    pub seed: Option<u32>,

    #[arg(long, default_value_t = 1)]
    pub mpi_procs: u32,

    #[arg(long, default_value_t = 1)]
    pub omp_threads: u32,

    /// high, normal or low
    #[arg(long, default_value = "normal")]
    pub priority: Priority,

    /// Submit to this host
    #[arg(long, conflicts_with = "host_group")]
    pub host: Option<String>,

    /// Submit to the least loaded member of this group
    #[arg(long)]
    pub host_group: Option<String>,

    /// Host parameter (key=value)
    #[arg(long = "host-param", value_parser = parse_key_val)]
    pub host_params: Vec<(String, String)>,

    /// Validate without saving
    #[arg(long)]
    pub dry_run: bool,

    /// Write the created run ids to this file
    #[arg(long)]
    pub output_ids: Option<PathBuf>,
}

/// What `fl run create` was asked to do
#[derive(Debug)]
enum Creation {
    Runs(CreateRuns),
    TopUp(TopUpBatch),
}

impl CreateArgs {
    fn creation(&self) -> Result<Creation> {
        if let Some(path) = &self.parameter_sets {
            let job = match &self.job_parameters {
                Some(job) => JobParameters::load(job)?,
                None => self.job(),
            };
            return Ok(Creation::TopUp(TopUpBatch {
                parameter_set_ids: read_parameter_set_ids(path)?,
                job,
                count: self.count,
            }));
        }
        let parameter_set = self.parameter_set.as_deref().unwrap_or_default();
        Ok(Creation::Runs(CreateRuns {
            seed: self.seed,
            ..self.job().request(parameter_set, self.count)
        }))
    }

    fn job(&self) -> JobParameters {
        JobParameters {
            host_id: self.host.clone(),
            host_group_id: self.host_group.clone(),
            host_parameters: self.host_params.iter().cloned().collect(),
            mpi_procs: Some(self.mpi_procs),
            omp_threads: Some(self.omp_threads),
            priority: Some(self.priority),
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid key=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn run_header() -> String {
    format!(
        "{:<33} {:<16} {:<10} {:>10}  {}",
        "ID", "PARAMETER SET", "STATUS", "SEED", "HOST"
    )
}

/// One line of `fl run list`
#[derive(Serialize)]
#[serde(transparent)]
struct RunRow(Run);

impl fmt::Display for RunRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = &self.0;
        write!(
            f,
            "{:<33} {:<16} {:<10} {:>10}  {}",
            run.id,
            run.parameter_set_id,
            run.status,
            run.seed,
            run.host_id.as_deref().unwrap_or("-")
        )
    }
}

/// Full record for `fl run show`
#[derive(Serialize)]
#[serde(transparent)]
struct RunDetail(Run);

impl fmt::Display for RunDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = &self.0;
        writeln!(f, "Run: {}", run.id)?;
        writeln!(f, "  Parameter set: {}", run.parameter_set_id)?;
        writeln!(f, "  Status: {}", run.status)?;
        writeln!(f, "  Priority: {}", run.priority)?;
        writeln!(f, "  Seed: {}", run.seed)?;
        write!(f, "  Processes: {} x {} threads", run.mpi_procs, run.omp_threads)?;
        if let Some(target) = &run.submitted_to {
            write!(f, "\n  Target: {}", target)?;
        }
        for (key, value) in &run.host_parameters {
            write!(f, "\n  Host parameter: {}={}", key, value)?;
        }
        if let Some(host) = &run.host_id {
            write!(f, "\n  Host: {}", host)?;
        }
        if let Some(job) = &run.job_id {
            write!(f, "\n  Job: {}", job)?;
        }
        if let Some(hostname) = &run.hostname {
            write!(f, "\n  Hostname: {}", hostname)?;
        }
        write!(f, "\n  Created: {}", run.created_at)?;
        let times = [
            ("Submitted", run.submitted_at),
            ("Started", run.started_at),
            ("Finished", run.finished_at),
            ("Included", run.included_at),
        ];
        for (label, time) in times {
            if let Some(time) = time {
                write!(f, "\n  {}: {}", label, time)?;
            }
        }
        if let (Some(cpu), Some(real)) = (run.cpu_time, run.real_time) {
            write!(f, "\n  Time: {:.2}s cpu, {:.2}s real", cpu, real)?;
        }
        if let Some(error) = &run.error {
            write!(f, "\n  Error: {}", error)?;
        }
        if let Some(result) = &run.result {
            write!(f, "\n  Result: {}", result)?;
        }
        Ok(())
    }
}

pub async fn handle(command: RunCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let mut store = Store::open(&config.state_dir)?;

    match command {
        RunCommand::Create(args) => create(&mut store, config, &args, format),
        RunCommand::List { status } => {
            let rows: Vec<RunRow> = list_runs(&mut store, status)?
                .into_iter()
                .map(RunRow)
                .collect();
            output::print_list(&rows, &run_header(), "No runs", format)
        }
        RunCommand::Show { id } => output::print(&RunDetail(find_run(&mut store, &id)?), format),
        RunCommand::Cancel { id } => {
            let shell = TracedShell::new(SystemShell::new());
            let run = cancel_run(&mut store, config, &shell, &id).await?;
            println!("Cancelled run {}", run.id);
            Ok(())
        }
        RunCommand::Discard { id } => {
            let run = discard_run(&mut store, &id)?;
            println!("Discarded run {}", run.id);
            Ok(())
        }
        RunCommand::Status { run_ids } => {
            let ids = read_run_ids(&run_ids)?;
            let counts = store.refresh()?.status_counts(Some(ids.as_slice()));
            println!("{}", serde_json::to_string(&counts)?);
            Ok(())
        }
    }
}

fn create(
    store: &mut Store,
    config: &Config,
    args: &CreateArgs,
    format: OutputFormat,
) -> Result<()> {
    match args.creation()? {
        Creation::Runs(request) => {
            let runs = create_runs(
                store,
                config,
                &request,
                &UuidIdGen,
                SystemClock.now(),
                args.dry_run,
            )?;
            let summary = format!(
                "{} {} run(s) for parameter set {}",
                created_verb(args.dry_run),
                runs.len(),
                request.parameter_set_id
            );
            report(&runs, &summary, args, format)
        }
        Creation::TopUp(batch) => {
            let outcome = top_up_batch(
                store,
                config,
                &batch,
                &UuidIdGen,
                SystemClock.now(),
                args.dry_run,
            );
            let summary = format!(
                "{} {} run(s); {} run(s) listed for {} parameter set(s)",
                created_verb(args.dry_run),
                outcome.created,
                outcome.runs.len(),
                batch.parameter_set_ids.len()
            );
            report(&outcome.runs, &summary, args, format)?;
            match outcome.error {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        }
    }
}

fn created_verb(dry_run: bool) -> &'static str {
    if dry_run {
        "Would create"
    } else {
        "Created"
    }
}

/// Write the run-id file and print the runs
fn report(runs: &[Run], summary: &str, args: &CreateArgs, format: OutputFormat) -> Result<()> {
    if let Some(path) = args.output_ids.as_ref().filter(|_| !args.dry_run) {
        write_run_ids(path, runs)?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(runs)?),
        OutputFormat::Text => {
            for run in runs {
                println!("{}", RunRow(run.clone()));
            }
            println!("{}", summary);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
