// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifier and seed generation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates run identifiers and random seeds
pub trait IdGen: Clone + Send + Sync {
    /// Next unique run identifier
    fn next(&self) -> String;

    /// Next candidate seed; uniqueness within a parameter set is checked by the caller
    fn seed(&self) -> u32;
}

/// UUID-based generator for production use
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn seed(&self) -> u32 {
        // 31 bits keeps seeds positive for simulators that read them as signed ints
        (uuid::Uuid::new_v4().as_u128() as u32) & 0x7fff_ffff
    }
}

/// Sequential generator for testing
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("run")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }

    fn seed(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::SeqCst) as u32
    }
}
