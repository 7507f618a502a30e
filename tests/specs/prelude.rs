//! Shared helpers for CLI specs

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Two hosts and a group over both
pub const CONFIG: &str = r#"
state_dir = "state"

[[hosts]]
id = "cluster"
name = "cluster.example.org"
scheduler = "torque"
max_num_jobs = 2

[[hosts.parameters]]
key = "queue"
default = "batch"
format = "[a-z]+"

[[hosts]]
id = "local"
name = "localhost"
scheduler = "none"
max_num_jobs = 1

[[host_groups]]
id = "pool"
name = "all hosts"
hosts = ["cluster", "local"]
"#;

/// A temp directory holding `flotilla.toml`
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self::with_config(CONFIG)
    }

    pub fn with_config(config: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("flotilla.toml"), config).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn fl(&self) -> CliRun {
        let mut cmd = Command::cargo_bin("fl").unwrap();
        cmd.current_dir(self.path())
            .env_remove("FLOTILLA_CONFIG")
            .env_remove("RUST_LOG");
        CliRun { cmd }
    }

    /// Create runs and return their ids
    pub fn create_runs(&self, args: &[&str]) -> Vec<String> {
        let ids = self.file("created.json");
        let mut argv = vec!["run", "create", "--output-ids", ids.to_str().unwrap()];
        argv.extend_from_slice(args);
        self.fl().args(&argv).passes();

        let entries: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(ids).unwrap()).unwrap();
        entries
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["run_id"].as_str().unwrap().to_string())
            .collect()
    }
}

pub struct CliRun {
    cmd: Command,
}

impl CliRun {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(mut self) -> CliOutput {
        let output = self.cmd.output().unwrap();
        let out = CliOutput::from(output);
        assert!(
            out.success,
            "expected success\nstdout:\n{}\nstderr:\n{}",
            out.stdout, out.stderr
        );
        out
    }

    pub fn fails(mut self) -> CliOutput {
        let output = self.cmd.output().unwrap();
        let out = CliOutput::from(output);
        assert!(
            !out.success,
            "expected failure\nstdout:\n{}\nstderr:\n{}",
            out.stdout, out.stderr
        );
        out
    }
}

pub struct CliOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for CliOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl CliOutput {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout.contains(needle),
            "stdout missing {:?}:\n{}",
            needle,
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr.contains(needle),
            "stderr missing {:?}:\n{}",
            needle,
            self.stderr
        );
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).unwrap()
    }
}
