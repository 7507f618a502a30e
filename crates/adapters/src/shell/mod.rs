// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution on hosts

mod system;

pub use system::SystemShell;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeShell, ShellCall};

use async_trait::async_trait;
use fl_core::Host;
use thiserror::Error;

/// Errors from shell execution
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to start command on {host}: {message}")]
    Spawn { host: String, message: String },
    #[error("ssh to {target} failed: {message}")]
    Connection { target: String, message: String },
}

/// Captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when killed by a signal
    pub code: Option<i32>,
}

impl ShellOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Adapter that runs shell command text on a host
///
/// A non-zero exit status is not an error here: `grep` without a match exits
/// 1 and that is a meaningful (empty) answer for status queries.
#[async_trait]
pub trait ShellAdapter: Clone + Send + Sync + 'static {
    async fn exec(&self, host: &Host, command: &str) -> Result<ShellOutput, ShellError>;
}
