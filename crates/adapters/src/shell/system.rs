// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local bash and ssh execution

use super::{ShellAdapter, ShellError, ShellOutput};
use async_trait::async_trait;
use fl_core::Host;
use tokio::process::Command;

/// ssh exits 255 when the connection itself fails
const SSH_CONNECTION_FAILED: i32 = 255;

/// Runs commands with `bash -c` locally, or through `ssh` for remote hosts
#[derive(Clone, Default)]
pub struct SystemShell;

impl SystemShell {
    pub fn new() -> Self {
        Self
    }
}

/// Prefix the command with a `cd` into the host's work directory
///
/// A failed `cd` exits before any part of the command runs, including
/// commands that background a job with `&`.
fn in_work_dir(host: &Host, command: &str) -> String {
    let dir = host.work_base_dir.to_string_lossy();
    format!("cd {} || exit 1\n{}", quote_dir(&dir), command)
}

/// Single-quote a directory, leaving a leading `~` or `~/` bare so it expands
fn quote_dir(dir: &str) -> String {
    let (home, rest) = if dir == "~" {
        ("~", "")
    } else if let Some(rest) = dir.strip_prefix("~/") {
        ("~/", rest)
    } else {
        ("", dir)
    };
    if rest.is_empty() {
        return home.to_string();
    }
    format!("{}'{}'", home, rest.replace('\'', "'\\''"))
}

#[async_trait]
impl ShellAdapter for SystemShell {
    async fn exec(&self, host: &Host, command: &str) -> Result<ShellOutput, ShellError> {
        let script = in_work_dir(host, command);

        let mut cmd = match &host.ssh {
            Some(target) => {
                let mut cmd = Command::new("ssh");
                cmd.args(["-o", "BatchMode=yes", target.as_str(), script.as_str()]);
                cmd
            }
            None => {
                let mut cmd = Command::new("bash");
                cmd.arg("-c").arg(&script);
                cmd
            }
        };
        // Dropped futures (timeouts) must not leave the child behind
        cmd.kill_on_drop(true);

        let output = cmd.output().await.map_err(|e| ShellError::Spawn {
            host: host.id.clone(),
            message: e.to_string(),
        })?;

        let result = ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        };

        if let Some(target) = &host.ssh {
            if result.code == Some(SSH_CONNECTION_FAILED) {
                return Err(ShellError::Connection {
                    target: target.clone(),
                    message: result.stderr.trim().to_string(),
                });
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
