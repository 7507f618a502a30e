// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fl-core: Core types for Flotilla
//!
//! This crate provides:
//! - The run record and its guarded state machine
//! - Host and host group configuration entities
//! - The uniform remote job state reported by schedulers
//! - Operations persisted to the write-ahead log

pub mod clock;
pub mod host;
pub mod id;
pub mod operation;
pub mod remote;
pub mod run;

pub use clock::{Clock, FakeClock, SystemClock};
pub use host::{Host, HostError, HostGroup, HostParameterDefinition, SubmitTarget};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use operation::Operation;
pub use remote::RemoteJobState;
pub use run::{Priority, Reservation, Run, RunStatus, Transition, TransitionError};
