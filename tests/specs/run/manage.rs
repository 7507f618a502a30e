//! Show, discard and cancel specs

use crate::prelude::*;

#[test]
fn show_prints_the_run() {
    let project = Project::new();
    let ids = project.create_runs(&[
        "--parameter-set",
        "ps-1",
        "--seed",
        "99",
        "--host",
        "cluster",
    ]);

    project
        .fl()
        .args(&["run", "show", &ids[0]])
        .passes()
        .stdout_has(&format!("Run: {}", ids[0]))
        .stdout_has("Status: created")
        .stdout_has("Seed: 99")
        .stdout_has("Target: host:cluster")
        .stdout_has("Host parameter: queue=batch");
}

#[test]
fn discarded_runs_disappear() {
    let project = Project::new();
    let ids = project.create_runs(&["--parameter-set", "ps-1", "-n", "2"]);

    project
        .fl()
        .args(&["run", "discard", &ids[0]])
        .passes()
        .stdout_has(&format!("Discarded run {}", ids[0]));

    let listed = project.fl().args(&["run", "list"]).passes();
    assert!(!listed.stdout.contains(ids[0].as_str()));
    assert!(listed.stdout.contains(ids[1].as_str()));

    project.fl().args(&["run", "show", &ids[0]]).fails();
}

#[test]
fn cancelling_a_created_run_needs_no_scheduler() {
    let project = Project::new();
    let ids = project.create_runs(&["--parameter-set", "ps-1", "--host", "cluster"]);

    project
        .fl()
        .args(&["run", "cancel", &ids[0]])
        .passes()
        .stdout_has(&format!("Cancelled run {}", ids[0]));

    project
        .fl()
        .args(&["run", "list", "--status", "created"])
        .passes()
        .stdout_has("No runs");
}

#[test]
fn list_filters_by_status() {
    let project = Project::new();
    project.create_runs(&["--parameter-set", "ps-1", "-n", "2"]);

    project
        .fl()
        .args(&["run", "list", "--status", "running"])
        .passes()
        .stdout_has("No runs");

    let out = project
        .fl()
        .args(&["--output", "json", "run", "list", "--status", "created"])
        .passes();
    assert_eq!(out.json().as_array().unwrap().len(), 2);
}
