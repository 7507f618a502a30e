// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fl host` - configured hosts and their current load

use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::{Args, Subcommand};
use fl_core::{Clock, SystemClock};
use fl_engine::{Config, HostCapacityManager};
use fl_storage::Store;
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct HostArgs {
    #[command(subcommand)]
    pub command: HostCommand,
}

#[derive(Subcommand)]
pub enum HostCommand {
    /// List hosts with capacity usage
    List,
}

#[derive(Serialize)]
struct HostInfo {
    id: String,
    name: String,
    scheduler: String,
    max_num_jobs: u32,
    occupied: usize,
    available: usize,
    groups: Vec<String>,
}

impl fmt::Display for HostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<16} {:<8} {:>4}/{:<4} {:>9}  {}",
            self.id,
            self.scheduler,
            self.occupied,
            self.max_num_jobs,
            self.available,
            self.groups.join(",")
        )
    }
}

pub fn handle(command: HostCommand, config: &Config, format: OutputFormat) -> Result<()> {
    match command {
        HostCommand::List => {
            let mut store = Store::open(&config.state_dir)?;
            let state = store.refresh()?;
            let usage = HostCapacityManager::new(config).all_usage(state, SystemClock.now());

            let hosts: Vec<HostInfo> = config
                .hosts
                .iter()
                .zip(usage)
                .map(|(host, usage)| HostInfo {
                    id: host.id.clone(),
                    name: host.name.clone(),
                    scheduler: host.scheduler.clone(),
                    max_num_jobs: host.max_num_jobs,
                    occupied: usage.occupied,
                    available: usage.available(),
                    groups: config
                        .host_groups
                        .iter()
                        .filter(|group| group.hosts.contains(&host.id))
                        .map(|group| group.id.clone())
                        .collect(),
                })
                .collect();

            let header = format!(
                "{:<16} {:<8} {:>9} {:>9}  GROUPS",
                "HOST", "SCHED", "USED", "AVAILABLE"
            );
            output::print_list(&hosts, &header, "No hosts configured", format)
        }
    }
}
