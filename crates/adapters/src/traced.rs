// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::results::{Harvest, HarvestError, ResultAdapter};
use crate::script::{ScriptAdapter, ScriptError};
use crate::shell::{ShellAdapter, ShellError, ShellOutput};
use async_trait::async_trait;
use fl_core::{Host, Run};

/// Wrapper that adds tracing to any ShellAdapter
#[derive(Clone)]
pub struct TracedShell<S> {
    inner: S,
}

impl<S> TracedShell<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ShellAdapter> ShellAdapter for TracedShell<S> {
    async fn exec(&self, host: &Host, command: &str) -> Result<ShellOutput, ShellError> {
        let span = tracing::info_span!(
            "shell.exec",
            host = %host.id,
            ssh = host.ssh.as_deref().unwrap_or("local")
        );
        let _guard = span.enter();

        // Precondition: there must be something to run
        if command.trim().is_empty() {
            tracing::error!("empty command");
            return Err(ShellError::Spawn {
                host: host.id.clone(),
                message: "empty command".to_string(),
            });
        }

        tracing::debug!(command, "executing");

        let start = std::time::Instant::now();
        let result = self.inner.exec(host, command).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(output) => tracing::debug!(
                code = ?output.code,
                stdout_len = output.stdout.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "command finished"
            ),
            Err(e) => tracing::error!(
                command,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "command failed"
            ),
        }

        result
    }
}

/// Wrapper that adds tracing to any ResultAdapter
#[derive(Clone)]
pub struct TracedResults<R> {
    inner: R,
}

impl<R> TracedResults<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: ResultAdapter> ResultAdapter for TracedResults<R> {
    async fn harvest(&self, run: &Run) -> Result<Harvest, HarvestError> {
        let span = tracing::info_span!("results.harvest", run_id = %run.id);
        let _guard = span.enter();

        let result = self.inner.harvest(run).await;
        match &result {
            Ok(harvest) => tracing::info!(
                cpu_time = harvest.cpu_time,
                real_time = harvest.real_time,
                "harvested"
            ),
            // Not ready is the normal answer while a job still runs
            Err(HarvestError::NotReady(_)) => tracing::debug!("not ready"),
            Err(e) => tracing::warn!(error = %e, "harvest failed"),
        }

        result
    }
}

/// Wrapper that adds tracing to any ScriptAdapter
#[derive(Clone)]
pub struct TracedScripts<S> {
    inner: S,
}

impl<S> TracedScripts<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ScriptAdapter> ScriptAdapter for TracedScripts<S> {
    async fn script_path(&self, run: &Run, host: &Host) -> Result<String, ScriptError> {
        let span = tracing::info_span!("script.locate", run_id = %run.id, host = %host.id);
        let _guard = span.enter();

        let result = self.inner.script_path(run, host).await;
        match &result {
            Ok(path) => tracing::debug!(path, "located"),
            Err(e) => tracing::warn!(error = %e, "script lookup failed"),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
