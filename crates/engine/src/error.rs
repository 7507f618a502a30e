// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use crate::config::ConfigError;
use fl_adapters::{ConfigurationError, ScriptError, ShellError};
use fl_core::{HostError, RunStatus};
use fl_storage::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in daemons and user operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scheduler(#[from] ConfigurationError),
    #[error(transparent)]
    HostParameter(#[from] HostError),
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("host not found: {0}")]
    HostNotFound(String),
    #[error("host group not found: {0}")]
    HostGroupNotFound(String),
    #[error("host group {0} does not accept host parameters")]
    HostParametersOnGroup(String),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("run {id} is {status} and cannot be cancelled")]
    NotCancellable { id: String, status: RunStatus },
    #[error("seed {seed} is already used in parameter set {parameter_set_id}")]
    DuplicateSeed { parameter_set_id: String, seed: u32 },
    #[error("invalid parameter set id: {0:?}")]
    InvalidParameterSetId(String),
    #[error("{requested} runs requested; at most {limit} per request")]
    TooManyRuns { requested: usize, limit: usize },
    #[error("could not find an unused seed for parameter set {0}")]
    SeedsExhausted(String),
    #[error("command on {host} timed out after {timeout:?}: {command}")]
    Timeout {
        host: String,
        command: String,
        timeout: Duration,
    },
    #[error("command on {host} exited with {code:?}: {command}: {stderr}")]
    CommandFailed {
        host: String,
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("no job id in submit output on {host}: {stdout:?}")]
    NoJobId { host: String, stdout: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
