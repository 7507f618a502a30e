// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: schedulers, shells, scripts and results

pub mod results;
pub mod scheduler;
pub mod script;
pub mod shell;
pub mod traced;

pub use results::{DirectoryResults, Harvest, HarvestError, ResultAdapter};
pub use scheduler::{ConfigurationError, JobScheduler, SchedulerAdapter, SCHEDULER_TAGS};
pub use script::{DirectoryScripts, ScriptAdapter, ScriptError};
pub use shell::{ShellAdapter, ShellError, ShellOutput, SystemShell};
pub use traced::{TracedResults, TracedScripts, TracedShell};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use results::FakeResults;
#[cfg(any(test, feature = "test-support"))]
pub use script::FakeScripts;
#[cfg(any(test, feature = "test-support"))]
pub use shell::{FakeShell, ShellCall};
