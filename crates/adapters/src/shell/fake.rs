// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake shell adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ShellAdapter, ShellError, ShellOutput};
use async_trait::async_trait;
use fl_core::Host;
use std::sync::{Arc, Mutex};

/// Recorded shell call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCall {
    pub host_id: String,
    pub command: String,
}

#[derive(Debug, Clone)]
enum Response {
    Output(ShellOutput),
    Error(String),
    Hang,
}

#[derive(Debug, Clone)]
struct Rule {
    host_id: Option<String>,
    prefix: String,
    response: Response,
}

/// Fake shell answering by command prefix
///
/// The most recently registered matching rule wins. Unmatched commands
/// succeed with empty output.
#[derive(Clone, Default)]
pub struct FakeShell {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<ShellCall>>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Commands executed on a host, in order
    pub fn commands_on(&self, host_id: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.host_id == host_id)
            .map(|call| call.command)
            .collect()
    }

    /// Answer commands starting with `prefix` with `stdout`
    pub fn respond(&self, prefix: &str, stdout: &str) {
        self.push(None, prefix, Response::Output(ShellOutput::ok(stdout)));
    }

    /// Like [`FakeShell::respond`], limited to one host
    pub fn respond_on(&self, host_id: &str, prefix: &str, stdout: &str) {
        self.push(
            Some(host_id),
            prefix,
            Response::Output(ShellOutput::ok(stdout)),
        );
    }

    /// Fail commands starting with `prefix` before they run
    pub fn fail(&self, prefix: &str, message: &str) {
        self.push(None, prefix, Response::Error(message.to_string()));
    }

    /// Never complete commands starting with `prefix`
    pub fn hang(&self, prefix: &str) {
        self.push(None, prefix, Response::Hang);
    }

    fn push(&self, host_id: Option<&str>, prefix: &str, response: Response) {
        self.rules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Rule {
                host_id: host_id.map(str::to_string),
                prefix: prefix.to_string(),
                response,
            });
    }

    fn lookup(&self, host_id: &str, command: &str) -> Option<Response> {
        self.rules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|rule| {
                command.starts_with(&rule.prefix)
                    && rule.host_id.as_deref().is_none_or(|h| h == host_id)
            })
            .map(|rule| rule.response.clone())
    }
}

#[async_trait]
impl ShellAdapter for FakeShell {
    async fn exec(&self, host: &Host, command: &str) -> Result<ShellOutput, ShellError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ShellCall {
                host_id: host.id.clone(),
                command: command.to_string(),
            });

        match self.lookup(&host.id, command) {
            Some(Response::Output(output)) => Ok(output),
            Some(Response::Error(message)) => Err(ShellError::Spawn {
                host: host.id.clone(),
                message,
            }),
            Some(Response::Hang) => std::future::pending().await,
            None => Ok(ShellOutput::default()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
