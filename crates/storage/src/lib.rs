// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fl-storage: Durable run records shared between processes

mod state;
mod store;
mod wal;

pub use state::{MaterializedState, StateError, StatusCounts};
pub use store::{Store, StoreError};
pub use wal::{Wal, WalError};
