//! Run creation specs

use crate::prelude::*;

#[test]
fn creates_runs_and_writes_their_ids() {
    let project = Project::new();
    let ids = project.create_runs(&["--parameter-set", "ps-1", "-n", "3", "--host", "cluster"]);

    assert_eq!(ids.len(), 3);
    let listed = project.fl().args(&["run", "list"]).passes();
    for id in &ids {
        assert!(listed.stdout.contains(id.as_str()), "{}", listed.stdout);
    }
    assert_eq!(listed.stdout.matches("created").count(), 3);
}

#[test]
fn json_output_carries_defaults_and_resources() {
    let project = Project::new();
    let out = project
        .fl()
        .args(&[
            "--output",
            "json",
            "run",
            "create",
            "--parameter-set",
            "ps-1",
            "-n",
            "2",
            "--mpi-procs",
            "4",
            "--priority",
            "high",
            "--host",
            "cluster",
        ])
        .passes();

    let runs = out.json();
    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 2);
    for run in runs {
        assert_eq!(run["status"], "created");
        assert_eq!(run["priority"], "high");
        assert_eq!(run["mpi_procs"], 4);
        assert_eq!(run["host_parameters"]["queue"], "batch");
        assert_eq!(run["submitted_to"]["host"], "cluster");
    }
    assert_ne!(runs[0]["seed"], runs[1]["seed"]);
}

#[test]
fn dry_run_saves_nothing() {
    let project = Project::new();
    let ids = project.file("ids.json");
    project
        .fl()
        .args(&[
            "run",
            "create",
            "--parameter-set",
            "ps-1",
            "-n",
            "2",
            "--dry-run",
            "--output-ids",
            ids.to_str().unwrap(),
        ])
        .passes()
        .stdout_has("Would create 2 run(s) for parameter set ps-1");

    assert!(!ids.exists());
    project
        .fl()
        .args(&["run", "list"])
        .passes()
        .stdout_has("No runs");
}

#[test]
fn host_parameter_format_is_enforced() {
    let project = Project::new();
    project
        .fl()
        .args(&[
            "run",
            "create",
            "--parameter-set",
            "ps-1",
            "--host",
            "cluster",
            "--host-param",
            "queue=LONG",
        ])
        .fails()
        .stderr_has("parameter 'queue' value 'LONG' does not match");
}

#[test]
fn unknown_host_parameter_is_rejected() {
    let project = Project::new();
    project
        .fl()
        .args(&[
            "run",
            "create",
            "--parameter-set",
            "ps-1",
            "--host",
            "cluster",
            "--host-param",
            "walltime=1:00:00",
        ])
        .fails()
        .stderr_has("unknown host parameter 'walltime'");
}

#[test]
fn group_targets_reject_host_parameters() {
    let project = Project::new();
    project
        .fl()
        .args(&[
            "run",
            "create",
            "--parameter-set",
            "ps-1",
            "--host-group",
            "pool",
            "--host-param",
            "queue=long",
        ])
        .fails()
        .stderr_has("host group pool does not accept host parameters");
}

#[test]
fn explicit_seed_must_be_unused() {
    let project = Project::new();
    project.create_runs(&["--parameter-set", "ps-1", "--seed", "17"]);

    project
        .fl()
        .args(&["run", "create", "--parameter-set", "ps-1", "--seed", "17"])
        .fails()
        .stderr_has("seed 17 is already used in parameter set ps-1");

    // Another parameter set may reuse it
    project.create_runs(&["--parameter-set", "ps-2", "--seed", "17"]);
}

fn write_batch(project: &Project, ids: &[&str]) -> (String, String) {
    let entries: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| serde_json::json!({ "parameter_set_id": id }))
        .collect();
    let sets = project.file("parameter_set_ids.json");
    std::fs::write(&sets, serde_json::to_string(&entries).unwrap()).unwrap();
    let job = project.file("job_parameters.json");
    std::fs::write(
        &job,
        r#"{"host_id": "cluster", "host_parameters": {"queue": "long"}}"#,
    )
    .unwrap();
    (
        sets.to_str().unwrap().to_string(),
        job.to_str().unwrap().to_string(),
    )
}

#[test]
fn parameter_sets_are_topped_up_to_the_target() {
    let project = Project::new();
    let first = project.create_runs(&["--parameter-set", "ps-1", "-n", "5"]);
    project.create_runs(&["--parameter-set", "ps-2"]);
    let (sets, job) = write_batch(&project, &["ps-1", "ps-2"]);

    let ids = project.create_runs(&[
        "--parameter-sets",
        &sets,
        "--job-parameters",
        &job,
        "-n",
        "3",
    ]);

    assert_eq!(ids.len(), 6);
    assert!(ids[..3].iter().all(|id| first.contains(id)));
    let listed = project.fl().args(&["run", "list"]).passes();
    assert_eq!(listed.stdout.matches("created").count(), 8);
}

#[test]
fn bad_parameter_set_fails_after_the_good_ones() {
    let project = Project::new();
    let (sets, job) = write_batch(&project, &["ps-1", " ps-2", "ps-3"]);
    let ids = project.file("ids.json");

    project
        .fl()
        .args(&[
            "run",
            "create",
            "--parameter-sets",
            &sets,
            "--job-parameters",
            &job,
            "-n",
            "2",
            "--output-ids",
            ids.to_str().unwrap(),
        ])
        .fails()
        .stdout_has("Created 2 run(s)")
        .stderr_has("invalid parameter set id: \" ps-2\"");

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(ids).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 2);
}
