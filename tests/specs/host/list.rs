//! Host listing specs

use crate::prelude::*;

#[test]
fn lists_hosts_with_capacity_and_groups() {
    let project = Project::new();
    project
        .fl()
        .args(&["host", "list"])
        .passes()
        .stdout_has("cluster")
        .stdout_has("torque")
        .stdout_has("pool");
}

#[test]
fn created_runs_take_no_capacity() {
    let project = Project::new();
    project.create_runs(&["--parameter-set", "ps-1", "-n", "2", "--host", "cluster"]);

    let out = project
        .fl()
        .args(&["--output", "json", "host", "list"])
        .passes();
    let hosts = out.json();
    assert_eq!(hosts[0]["id"], "cluster");
    assert_eq!(hosts[0]["occupied"], 0);
    assert_eq!(hosts[0]["available"], 2);
    assert_eq!(hosts[1]["id"], "local");
    assert_eq!(hosts[1]["groups"], serde_json::json!(["pool"]));
}

#[test]
fn no_hosts_configured() {
    let project = Project::with_config("state_dir = \"state\"\n");
    project
        .fl()
        .args(&["host", "list"])
        .passes()
        .stdout_has("No hosts configured");
}
