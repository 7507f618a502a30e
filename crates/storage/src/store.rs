// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock-guarded compare-and-set store over the WAL
//!
//! Every daemon and CLI invocation opens its own [`Store`] on the same state
//! directory. Writers take an exclusive lock on `runs.lock`, catch up with the
//! log, validate their operations against the fresh state and append them.
//! A writer that read stale state gets [`StateError::Conflict`] instead of
//! overwriting a newer status.

use crate::state::{MaterializedState, StateError};
use crate::wal::{Wal, WalError};
use fl_core::Operation;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const WAL_FILE: &str = "runs.wal";
const LOCK_FILE: &str = "runs.lock";

/// Errors from store access
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error(transparent)]
    State(#[from] StateError),
}

impl StoreError {
    /// Whether another writer changed the run first
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::State(StateError::Conflict { .. } | StateError::Discarded(_))
        )
    }
}

/// Shared run store rooted at a state directory
pub struct Store {
    dir: PathBuf,
    lock: File,
    wal: Wal,
    state: MaterializedState,
}

struct LockGuard<'a>(&'a File);

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let _ = <File as FileExt>::unlock(self.0);
    }
}

impl Store {
    /// Open (creating if needed) the store in `dir` and replay its log
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| StoreError::Io {
                path: lock_path,
                source,
            })?;

        let wal = Wal::open(&dir.join(WAL_FILE))?;
        let mut store = Self {
            dir: dir.to_path_buf(),
            lock,
            wal,
            state: MaterializedState::default(),
        };
        store.refresh()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// State as of the last refresh or write
    pub fn state(&self) -> &MaterializedState {
        &self.state
    }

    /// Catch up with writes made by other processes
    pub fn refresh(&mut self) -> Result<&MaterializedState, StoreError> {
        let _guard = lock(&self.lock, &self.dir, <File as FileExt>::lock_shared)?;
        catch_up(&mut self.wal, &mut self.state)?;
        Ok(&self.state)
    }

    /// Run `f` against fresh state under the exclusive lock and persist the
    /// operations it returns
    ///
    /// Each operation is re-checked before it is appended; the first failing
    /// check aborts the remainder.
    pub fn transact<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&MaterializedState) -> Result<(Vec<Operation>, T), E>,
        E: From<StoreError>,
    {
        let _guard = lock(&self.lock, &self.dir, <File as FileExt>::lock_exclusive)?;
        catch_up(&mut self.wal, &mut self.state)?;

        let (ops, value) = f(&self.state)?;
        for op in &ops {
            self.state.check(op).map_err(StoreError::from)?;
            self.wal.append(op).map_err(StoreError::from)?;
            self.state.apply(op);
        }

        Ok(value)
    }

    /// Persist a single operation
    pub fn commit(&mut self, op: Operation) -> Result<(), StoreError> {
        self.transact(|_| Ok::<_, StoreError>((vec![op], ())))
    }
}

fn lock<'a>(
    file: &'a File,
    dir: &Path,
    acquire: fn(&File) -> io::Result<()>,
) -> Result<LockGuard<'a>, StoreError> {
    acquire(file).map_err(|source| StoreError::Io {
        path: dir.join(LOCK_FILE),
        source,
    })?;
    Ok(LockGuard(file))
}

fn catch_up(wal: &mut Wal, state: &mut MaterializedState) -> Result<(), StoreError> {
    for op in wal.read_new()? {
        state.apply(&op);
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
