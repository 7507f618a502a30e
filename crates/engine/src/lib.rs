// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fl-engine: Flotilla daemons and user operations

mod capacity;
mod command;
pub mod config;
mod context;
mod error;
mod health;
pub mod heartbeat;
mod observer;
pub mod runs;
mod submitter;

#[cfg(test)]
mod test_helpers;

pub use capacity::{HostCapacityManager, HostUsage};
pub use config::{resolve_config_path, Config, ConfigError};
pub use context::{run_periodic, Cycle, DaemonContext, DaemonKind};
pub use error::EngineError;
pub use health::{HealthMonitor, StatusCache};
pub use heartbeat::{DaemonHealth, Liveness};
pub use observer::{ObserveSummary, Observer};
pub use runs::CreateRuns;
pub use submitter::{SubmitSummary, Submitter};
