//! Aggregate status query specs

use crate::prelude::*;

#[test]
fn status_counts_runs_from_an_id_file() {
    let project = Project::new();
    project.create_runs(&["--parameter-set", "ps-1", "-n", "3"]);
    let ids_file = project.file("created.json");

    let out = project
        .fl()
        .args(&["run", "status", "--run-ids", ids_file.to_str().unwrap()])
        .passes();

    similar_asserts::assert_eq!(
        out.stdout.trim(),
        r#"{"total":3,"created":3,"submitted":0,"running":0,"finished":0,"failed":0}"#
    );
}

#[test]
fn status_ignores_unknown_and_discarded_ids() {
    let project = Project::new();
    let ids = project.create_runs(&["--parameter-set", "ps-1", "-n", "2"]);
    project.fl().args(&["run", "discard", &ids[0]]).passes();

    let ids_file = project.file("mixed.json");
    let entries = serde_json::json!([
        {"run_id": ids[0]},
        {"run_id": ids[1]},
        {"run_id": "no-such-run"},
    ]);
    std::fs::write(&ids_file, entries.to_string()).unwrap();

    let out = project
        .fl()
        .args(&["run", "status", "--run-ids", ids_file.to_str().unwrap()])
        .passes();
    let counts = out.json();
    assert_eq!(counts["total"], 1);
    assert_eq!(counts["created"], 1);
}

#[test]
fn malformed_id_file_fails() {
    let project = Project::new();
    let ids_file = project.file("bad.json");
    std::fs::write(&ids_file, r#"{"run_id": "x"}"#).unwrap();

    project
        .fl()
        .args(&["run", "status", "--run-ids", ids_file.to_str().unwrap()])
        .fails()
        .stderr_has("JSON error");
}
