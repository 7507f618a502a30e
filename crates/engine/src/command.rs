// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote command execution with a time limit

use crate::error::EngineError;
use fl_adapters::{ShellAdapter, ShellOutput};
use fl_core::Host;
use std::time::Duration;

/// Run `command` on `host`, giving up after `limit`
///
/// Only spawn and connection errors and the timeout are errors here; a
/// nonzero exit is returned as output for the caller to judge.
pub async fn exec_with_timeout<S: ShellAdapter>(
    shell: &S,
    host: &Host,
    command: &str,
    limit: Duration,
) -> Result<ShellOutput, EngineError> {
    match tokio::time::timeout(limit, shell.exec(host, command)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(EngineError::Timeout {
            host: host.id.clone(),
            command: command.to_string(),
            timeout: limit,
        }),
    }
}

/// Like [`exec_with_timeout`], but a nonzero exit is an error too
pub async fn exec_checked<S: ShellAdapter>(
    shell: &S,
    host: &Host,
    command: &str,
    limit: Duration,
) -> Result<ShellOutput, EngineError> {
    let output = exec_with_timeout(shell, host, command, limit).await?;
    if !output.success() {
        return Err(EngineError::CommandFailed {
            host: host.id.clone(),
            command: command.to_string(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}
