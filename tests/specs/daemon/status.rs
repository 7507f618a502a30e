//! Daemon heartbeat specs

use crate::prelude::*;

#[test]
fn nothing_running_in_a_fresh_project() {
    let project = Project::new();
    let out = project
        .fl()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status cache: none");

    for daemon in ["submitter", "observer", "service"] {
        let line = out
            .stdout
            .lines()
            .find(|line| line.starts_with(daemon))
            .unwrap();
        assert!(line.ends_with("not running"), "{}", line);
    }
}

#[test]
fn stale_pid_file_is_not_running() {
    let project = Project::new();
    let pids = project.file("state/pids");
    std::fs::create_dir_all(&pids).unwrap();
    // Far above any default pid_max
    std::fs::write(pids.join("observer.pid"), "2147483000\n").unwrap();

    let out = project
        .fl()
        .args(&["--output", "json", "daemon", "status"])
        .passes();
    let status = out.json();
    let observer = &status["daemons"][1];
    assert_eq!(observer["daemon"], "observer");
    assert_eq!(observer["liveness"], "not_running");
    assert!(status["status_cache"].is_null());
}

#[test]
fn status_cache_is_summarised() {
    let project = Project::new();
    std::fs::create_dir_all(project.file("state")).unwrap();
    let cache = serde_json::json!({
        "updated_at": "2026-01-01T00:00:00Z",
        "overall": {"total": 5, "created": 1, "submitted": 1, "running": 1, "finished": 1, "failed": 1},
        "parameter_sets": {},
    });
    std::fs::write(project.file("state/status_cache.json"), cache.to_string()).unwrap();

    project
        .fl()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status cache: 5 runs, updated");
}
