//! Error reporting specs

use crate::prelude::*;

#[test]
fn unknown_scheduler_is_rejected_before_any_work() {
    let project = Project::with_config(
        r#"
state_dir = "state"

[[hosts]]
id = "grid"
name = "grid"
scheduler = "slurm"
max_num_jobs = 4
"#,
    );

    project
        .fl()
        .args(&["run", "list"])
        .fails()
        .stderr_has("unknown scheduler type 'slurm'");
    assert!(!project.file("state").exists());
}

#[test]
fn missing_config_file_is_reported() {
    let project = Project::new();
    project
        .fl()
        .args(&["--config", "nowhere.toml", "run", "list"])
        .fails()
        .stderr_has("failed to read config");
}

#[test]
fn config_comes_from_environment() {
    let project = Project::new();
    std::fs::rename(project.file("flotilla.toml"), project.file("other.toml")).unwrap();

    project.fl().args(&["run", "list"]).fails();

    project
        .fl()
        .env("FLOTILLA_CONFIG", "other.toml")
        .args(&["run", "list"])
        .passes()
        .stdout_has("No runs");
}

#[test]
fn unknown_run_is_an_error() {
    let project = Project::new();
    project
        .fl()
        .args(&["run", "show", "missing"])
        .fails()
        .stderr_has("run not found: missing");
}
