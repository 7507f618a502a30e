// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests

use crate::config::Config;
use chrono::{DateTime, TimeZone, Utc};
use fl_core::{Host, HostGroup};
use std::path::{Path, PathBuf};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn host(id: &str, scheduler: &str, max_num_jobs: u32) -> Host {
    Host {
        id: id.to_string(),
        name: id.to_string(),
        scheduler: scheduler.to_string(),
        max_num_jobs,
        ssh: None,
        work_base_dir: PathBuf::from("/work"),
        parameters: Vec::new(),
    }
}

pub fn group(id: &str, hosts: &[&str]) -> HostGroup {
    HostGroup {
        id: id.to_string(),
        name: id.to_string(),
        hosts: hosts.iter().map(|h| h.to_string()).collect(),
    }
}

pub fn config(state_dir: &Path, hosts: Vec<Host>, host_groups: Vec<HostGroup>) -> Config {
    let mut config = Config {
        state_dir: state_dir.to_path_buf(),
        hosts,
        host_groups,
        ..Config::default()
    };
    config.scripts.dir = state_dir.join("scripts");
    config.results.dir = state_dir.join("results");
    config.validate().unwrap();
    config
}
