// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution hosts and host groups
//!
//! Both are administered outside Flotilla and are read-only here.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from host parameter validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("host {host}: unknown host parameter '{key}'")]
    UnknownParameter { host: String, key: String },
    #[error("host {host}: missing host parameter '{key}'")]
    MissingParameter { host: String, key: String },
    #[error("host {host}: parameter '{key}' value '{value}' does not match {format}")]
    FormatMismatch {
        host: String,
        key: String,
        value: String,
        format: String,
    },
    #[error("host {host}: invalid format for parameter '{key}': {message}")]
    InvalidFormat {
        host: String,
        key: String,
        message: String,
    },
}

/// Definition of a host-specific job parameter (queue name, walltime, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostParameterDefinition {
    pub key: String,
    #[serde(default)]
    pub default: Option<String>,
    /// Regex the whole value must match
    #[serde(default)]
    pub format: Option<String>,
}

/// A target execution endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    pub name: String,
    /// Scheduler tag: `none`, `torque` or `pjm`
    pub scheduler: String,
    /// Maximum simultaneous submitted + running runs
    pub max_num_jobs: u32,
    /// `user@host` for remote hosts; local execution when absent
    #[serde(default)]
    pub ssh: Option<String>,
    #[serde(default = "default_work_base_dir")]
    pub work_base_dir: PathBuf,
    #[serde(default)]
    pub parameters: Vec<HostParameterDefinition>,
}

fn default_work_base_dir() -> PathBuf {
    PathBuf::from("~")
}

impl Host {
    /// Validate a run's host parameters, filling defaults
    pub fn validate_parameters(
        &self,
        given: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, HostError> {
        if let Some(key) = given
            .keys()
            .find(|key| !self.parameters.iter().any(|def| &def.key == *key))
        {
            return Err(HostError::UnknownParameter {
                host: self.id.clone(),
                key: key.clone(),
            });
        }

        let mut resolved = BTreeMap::new();
        for def in &self.parameters {
            let value = match given.get(&def.key).or(def.default.as_ref()) {
                Some(value) => value.clone(),
                None => {
                    return Err(HostError::MissingParameter {
                        host: self.id.clone(),
                        key: def.key.clone(),
                    })
                }
            };

            if let Some(format) = &def.format {
                let re = compile_format(format).map_err(|e| HostError::InvalidFormat {
                    host: self.id.clone(),
                    key: def.key.clone(),
                    message: e.to_string(),
                })?;
                if !re.is_match(&value) {
                    return Err(HostError::FormatMismatch {
                        host: self.id.clone(),
                        key: def.key.clone(),
                        value,
                        format: format.clone(),
                    });
                }
            }

            resolved.insert(def.key.clone(), value);
        }

        Ok(resolved)
    }

    /// Compile every parameter format, reporting the first bad one
    pub fn check_formats(&self) -> Result<(), HostError> {
        for def in &self.parameters {
            if let Some(format) = &def.format {
                compile_format(format).map_err(|e| HostError::InvalidFormat {
                    host: self.id.clone(),
                    key: def.key.clone(),
                    message: e.to_string(),
                })?;
            }
        }
        Ok(())
    }
}

fn compile_format(format: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", format))
}

/// A named pool of hosts; the submitter picks the member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostGroup {
    pub id: String,
    pub name: String,
    pub hosts: Vec<String>,
}

/// Where a run was asked to execute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTarget {
    Host(String),
    HostGroup(String),
}

impl fmt::Display for SubmitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitTarget::Host(id) => write!(f, "host:{}", id),
            SubmitTarget::HostGroup(id) => write!(f, "group:{}", id),
        }
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
