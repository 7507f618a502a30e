//! Help output specs

use crate::prelude::*;

#[test]
fn help_lists_command_groups() {
    let project = Project::new();
    project
        .fl()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("host")
        .stdout_has("daemon");
}

#[test]
fn run_create_help_lists_targets() {
    let project = Project::new();
    project
        .fl()
        .args(&["run", "create", "--help"])
        .passes()
        .stdout_has("--parameter-set")
        .stdout_has("--host-group")
        .stdout_has("--dry-run");
}
