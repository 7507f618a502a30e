// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{at, config, group, host};
use fl_adapters::{FakeScripts, FakeShell, ShellError, ShellOutput};
use fl_core::{FakeClock, Priority};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

type TestSubmitter = Submitter<FakeShell, FakeScripts, FakeClock>;

struct Harness {
    _dir: TempDir,
    state_dir: PathBuf,
    shell: FakeShell,
    scripts: FakeScripts,
    clock: FakeClock,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let state_dir = dir.path().join("state");
        let clock = FakeClock::new();
        clock.set(at(1000));
        Self {
            _dir: dir,
            state_dir,
            shell: FakeShell::new(),
            scripts: FakeScripts::new(),
            clock,
        }
    }

    fn store(&self) -> Store {
        Store::open(&self.state_dir).unwrap()
    }

    fn submitter(&self, config: Config) -> TestSubmitter {
        Submitter::new(
            config,
            self.store(),
            self.shell.clone(),
            self.scripts.clone(),
            self.clock.clone(),
        )
        .with_holder("submitter-test")
    }

    fn torque_config(&self, max_num_jobs: u32) -> Config {
        config(&self.state_dir, vec![host("cluster", "torque", max_num_jobs)], vec![])
    }

    fn queue(&self, id: &str, created: i64, target: SubmitTarget) {
        let run = Run::new(id, "ps-1", 1, at(created)).with_target(target);
        self.store().commit(Operation::RunCreate { run }).unwrap();
    }

    fn run(&self, id: &str) -> Run {
        self.store().state().runs[id].clone()
    }
}

fn on_host(id: &str) -> SubmitTarget {
    SubmitTarget::Host(id.to_string())
}

#[tokio::test]
async fn submits_up_to_host_capacity() {
    let h = Harness::new();
    h.shell.respond("qsub /scripts/run-1", "101.server\n");
    h.shell.respond("qsub /scripts/run-2", "102.server\n");
    h.shell.respond("qsub /scripts/run-3", "103.server\n");
    for (i, id) in ["run-1", "run-2", "run-3"].iter().enumerate() {
        h.queue(id, i as i64, on_host("cluster"));
    }

    let mut submitter = h.submitter(h.torque_config(2));
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.failed, 0);

    let first = h.run("run-1");
    assert_eq!(first.status, RunStatus::Submitted);
    assert_eq!(first.job_id.as_deref(), Some("101.server"));
    assert_eq!(first.host_id.as_deref(), Some("cluster"));
    assert_eq!(first.submitted_at, Some(at(1000)));
    assert!(first.reservation.is_none());

    let third = h.run("run-3");
    assert_eq!(third.status, RunStatus::Created);
    assert!(third.reservation.is_none());
    assert_eq!(
        h.shell.commands_on("cluster"),
        vec!["qsub /scripts/run-1.sh", "qsub /scripts/run-2.sh"]
    );
}

#[tokio::test]
async fn high_priority_runs_go_first() {
    let h = Harness::new();
    h.shell.respond("qsub", "7.server");
    h.queue("run-old", 0, on_host("cluster"));
    let urgent = Run::new("run-new", "ps-1", 2, at(5))
        .with_target(on_host("cluster"))
        .with_priority(Priority::High);
    h.store().commit(Operation::RunCreate { run: urgent }).unwrap();

    let mut submitter = h.submitter(h.torque_config(1));
    submitter.run_cycle().await.unwrap();

    assert_eq!(h.run("run-new").status, RunStatus::Submitted);
    assert_eq!(h.run("run-old").status, RunStatus::Created);
}

#[tokio::test]
async fn runs_without_target_stay_queued() {
    let h = Harness::new();
    let run = Run::new("run-1", "ps-1", 1, at(0));
    h.store().commit(Operation::RunCreate { run }).unwrap();

    let mut submitter = h.submitter(h.torque_config(1));
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary, SubmitSummary::default());
    assert!(h.shell.calls().is_empty());
}

#[tokio::test]
async fn failed_submit_releases_reservation() {
    let h = Harness::new();
    h.shell.fail("qsub", "connection refused");
    h.queue("run-1", 0, on_host("cluster"));

    let mut submitter = h.submitter(h.torque_config(1));
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary.failed, 1);
    let run = h.run("run-1");
    assert_eq!(run.status, RunStatus::Created);
    assert!(run.reservation.is_none());
    assert!(run.job_id.is_none());
}

#[tokio::test]
async fn nonzero_exit_and_missing_job_id_are_failures() {
    let h = Harness::new();
    // Unmatched commands exit without a code
    h.queue("run-1", 0, on_host("cluster"));
    h.shell.respond("qsub /scripts/run-2", "   \n");
    h.queue("run-2", 1, on_host("cluster"));

    let mut submitter = h.submitter(h.torque_config(2));
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(h.run("run-1").status, RunStatus::Created);
    assert_eq!(h.run("run-2").status, RunStatus::Created);
    assert!(h.run("run-2").reservation.is_none());
}

#[tokio::test]
async fn missing_script_leaves_run_queued() {
    let h = Harness::new();
    h.shell.respond("qsub", "1.server");
    h.scripts.set_missing("run-1");
    h.queue("run-1", 0, on_host("cluster"));

    let mut submitter = h.submitter(h.torque_config(1));
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert!(h.shell.calls().is_empty());
    assert!(h.run("run-1").reservation.is_none());
}

#[tokio::test]
async fn hanging_submit_times_out() {
    let h = Harness::new();
    h.shell.hang("qsub");
    h.queue("run-1", 0, on_host("cluster"));

    let mut config = h.torque_config(1);
    config.submitter.command_timeout = Duration::from_millis(20);
    let mut submitter = h.submitter(config);
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary.failed, 1);
    let run = h.run("run-1");
    assert_eq!(run.status, RunStatus::Created);
    assert!(run.reservation.is_none());
}

#[tokio::test]
async fn live_foreign_reservation_holds_capacity() {
    let h = Harness::new();
    h.shell.respond("qsub", "1.server");
    h.queue("run-1", 0, on_host("cluster"));
    h.queue("run-2", 1, on_host("cluster"));
    h.store()
        .commit(Operation::RunReserve {
            id: "run-1".to_string(),
            reservation: Reservation {
                holder: "submitter-other".to_string(),
                host_id: "cluster".to_string(),
                reserved_at: at(990),
            },
        })
        .unwrap();

    let mut submitter = h.submitter(h.torque_config(1));
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary.submitted, 0);
    assert!(h.shell.calls().is_empty());
    assert_eq!(
        h.run("run-1").reservation.map(|r| r.holder),
        Some("submitter-other".to_string())
    );
}

#[tokio::test]
async fn stale_reservations_are_released_and_retried() {
    let h = Harness::new();
    h.shell.respond("qsub", "5.server");
    h.queue("run-1", 0, on_host("cluster"));
    h.store()
        .commit(Operation::RunReserve {
            id: "run-1".to_string(),
            reservation: Reservation {
                holder: "submitter-crashed".to_string(),
                host_id: "cluster".to_string(),
                reserved_at: at(0),
            },
        })
        .unwrap();

    let mut submitter = h.submitter(h.torque_config(1));
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary.released_stale, 1);
    assert_eq!(summary.submitted, 1);
    assert_eq!(h.run("run-1").status, RunStatus::Submitted);
}

#[tokio::test]
async fn group_target_uses_member_with_most_room() {
    let h = Harness::new();
    h.shell.respond("qsub", "9.server");
    h.shell.respond("nohup", "run-1.sh");
    let config = config(
        &h.state_dir,
        vec![host("small", "torque", 1), host("big", "none", 3)],
        vec![group("pool", &["small", "big"])],
    );
    h.queue("run-1", 0, SubmitTarget::HostGroup("pool".to_string()));

    let mut submitter = h.submitter(config);
    submitter.run_cycle().await.unwrap();

    let run = h.run("run-1");
    assert_eq!(run.status, RunStatus::Submitted);
    assert_eq!(run.host_id.as_deref(), Some("big"));
    assert_eq!(run.job_id.as_deref(), Some("run-1.sh"));
    assert!(h.shell.commands_on("small").is_empty());
}

#[tokio::test]
async fn full_target_is_skipped_for_the_rest_of_the_cycle() {
    let h = Harness::new();
    h.shell.respond("qsub", "1.server");
    for i in 0..5 {
        h.queue(&format!("run-{}", i), i, on_host("cluster"));
    }

    let mut submitter = h.submitter(h.torque_config(1));
    let summary = submitter.run_cycle().await.unwrap();
    assert_eq!(summary.submitted, 1);

    // Next cycle: the outstanding run still occupies the only slot
    let summary = submitter.run_cycle().await.unwrap();
    assert_eq!(summary.submitted, 0);
    assert_eq!(h.shell.calls().len(), 1);
}

/// Shell that discards the run from another store handle while submitting
#[derive(Clone)]
struct DiscardingShell {
    state_dir: PathBuf,
    inner: FakeShell,
}

#[async_trait]
impl ShellAdapter for DiscardingShell {
    async fn exec(&self, host: &Host, command: &str) -> Result<ShellOutput, ShellError> {
        if command.starts_with("qsub") {
            discard(&self.state_dir, "run-1");
        }
        self.inner.exec(host, command).await
    }
}

fn discard(state_dir: &Path, id: &str) {
    let mut store = Store::open(state_dir).unwrap();
    store
        .commit(Operation::RunDiscard {
            id: id.to_string(),
            from: RunStatus::Created,
        })
        .unwrap();
}

#[tokio::test]
async fn job_is_cancelled_when_run_is_discarded_mid_submit() {
    let h = Harness::new();
    h.shell.respond("qsub", "77.server");
    h.shell.respond("qdel", "");
    h.queue("run-1", 0, on_host("cluster"));

    let shell = DiscardingShell {
        state_dir: h.state_dir.clone(),
        inner: h.shell.clone(),
    };
    let mut submitter = Submitter::new(
        h.torque_config(1),
        h.store(),
        shell,
        h.scripts.clone(),
        h.clock.clone(),
    );
    let summary = submitter.run_cycle().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(
        h.shell.commands_on("cluster"),
        vec!["qsub /scripts/run-1.sh", "qdel 77.server"]
    );
    let run = h.run("run-1");
    assert!(run.discarded);
    assert_eq!(run.status, RunStatus::Created);
}
