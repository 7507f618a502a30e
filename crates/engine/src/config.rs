// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flotilla.toml` loading and validation
//!
//! Relative paths are resolved against the directory holding the file.

use fl_adapters::{ConfigurationError, SchedulerAdapter};
use fl_core::{Host, HostError, HostGroup};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "FLOTILLA_CONFIG";

/// Default config file name in the working directory
pub const CONFIG_FILE: &str = "flotilla.toml";

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("host {host}: {source}")]
    Scheduler {
        host: String,
        #[source]
        source: ConfigurationError,
    },
    #[error(transparent)]
    HostParameter(#[from] HostError),
    #[error("host {0}: max_num_jobs must be at least 1")]
    NoCapacity(String),
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("host group {group} names unknown host {host}")]
    UnknownMember { group: String, host: String },
    #[error("host group {0} has no hosts")]
    EmptyGroup(String),
    #[error(
        "submitter.reservation_timeout ({reservation:?}) must exceed submitter.command_timeout ({command:?})"
    )]
    ReservationTimeout {
        reservation: Duration,
        command: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub dir: PathBuf,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scripts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub dir: PathBuf,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SubmitterConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Limit for one remote submit command
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
    /// Age after which an unconfirmed reservation no longer holds capacity
    #[serde(with = "humantime_serde")]
    pub reservation_timeout: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            command_timeout: Duration::from_secs(120),
            reservation_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
    /// Consecutive `unknown` polls tolerated before a run is failed
    pub unknown_poll_limit: u32,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            command_timeout: Duration::from_secs(120),
            unknown_poll_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// A daemon whose log is older than this is reported as hanging
    #[serde(with = "humantime_serde")]
    pub log_stale_after: Duration,
    /// Status-count cache; `<state_dir>/status_cache.json` when unset
    pub cache_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            log_stale_after: Duration::from_secs(5 * 60),
            cache_path: None,
        }
    }
}

/// Flotilla configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub state_dir: PathBuf,
    pub scripts: ScriptsConfig,
    pub results: ResultsConfig,
    pub submitter: SubmitterConfig,
    pub observer: ObserverConfig,
    pub service: ServiceConfig,
    pub hosts: Vec<Host>,
    pub host_groups: Vec<HostGroup>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".flotilla"),
            scripts: ScriptsConfig::default(),
            results: ResultsConfig::default(),
            submitter: SubmitterConfig::default(),
            observer: ObserverConfig::default(),
            service: ServiceConfig::default(),
            hosts: Vec::new(),
            host_groups: Vec::new(),
        }
    }
}

impl Config {
    /// Read, resolve and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base)
    }

    /// Parse config text, resolving relative paths against `base`
    pub fn parse(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.state_dir);
        resolve(&mut self.scripts.dir);
        resolve(&mut self.results.dir);
        if let Some(cache) = self.service.cache_path.as_mut() {
            resolve(cache);
        }
    }

    /// Check timeouts, hosts and groups; every scheduler tag must be known
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A reservation must outlive the submit command that confirms it
        let submitter = &self.submitter;
        if submitter.reservation_timeout <= submitter.command_timeout {
            return Err(ConfigError::ReservationTimeout {
                reservation: submitter.reservation_timeout,
                command: submitter.command_timeout,
            });
        }

        let mut host_ids = HashSet::new();
        for host in &self.hosts {
            if !host_ids.insert(host.id.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "host",
                    id: host.id.clone(),
                });
            }
            SchedulerAdapter::new(&host.scheduler).map_err(|source| ConfigError::Scheduler {
                host: host.id.clone(),
                source,
            })?;
            if host.max_num_jobs == 0 {
                return Err(ConfigError::NoCapacity(host.id.clone()));
            }
            host.check_formats()?;
        }

        let mut group_ids = HashSet::new();
        for group in &self.host_groups {
            if !group_ids.insert(group.id.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "host group",
                    id: group.id.clone(),
                });
            }
            if group.hosts.is_empty() {
                return Err(ConfigError::EmptyGroup(group.id.clone()));
            }
            if let Some(missing) = group.hosts.iter().find(|h| !host_ids.contains(h.as_str())) {
                return Err(ConfigError::UnknownMember {
                    group: group.id.clone(),
                    host: missing.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn host(&self, id: &str) -> Option<&Host> {
        self.hosts.iter().find(|host| host.id == id)
    }

    pub fn host_group(&self, id: &str) -> Option<&HostGroup> {
        self.host_groups.iter().find(|group| group.id == id)
    }

    /// Scheduler adapter for a configured host
    pub fn scheduler_for(&self, host: &Host) -> Result<SchedulerAdapter, ConfigurationError> {
        SchedulerAdapter::new(&host.scheduler)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.service
            .cache_path
            .clone()
            .unwrap_or_else(|| self.state_dir.join("status_cache.json"))
    }
}

/// Config path from the flag, `FLOTILLA_CONFIG`, or `./flotilla.toml`
pub fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
