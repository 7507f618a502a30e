// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage
//!
//! The log is shared by several processes. Each handle remembers how far it
//! has read and catches up with [`Wal::read_new`] before writing. Callers
//! serialize writers with the store lock.

use fl_core::Operation;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error at line {line}: {source}")]
    Json {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    path: PathBuf,
    file: File,
    /// Byte offset of the first unread entry
    offset: u64,
    sequence: u64,
}

impl Wal {
    /// Open or create a WAL at the given path, positioned at the start
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: 0,
            sequence: 0,
        })
    }

    /// Read entries appended since the last call (or since open)
    pub fn read_new(&mut self) -> Result<Vec<Operation>, WalError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(self.offset))?;

        let mut ops = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            // A torn final line is left for the next read
            if !line.ends_with('\n') {
                break;
            }
            self.offset += read as u64;

            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            self.sequence += 1;
            let entry: WalEntry =
                serde_json::from_str(trimmed).map_err(|source| WalError::Json {
                    line: self.sequence,
                    source,
                })?;
            ops.push(entry.op);
        }

        Ok(ops)
    }

    /// Append an operation to the log
    ///
    /// The handle must be caught up, otherwise the sequence numbers drift.
    pub fn append(&mut self, op: &Operation) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let line = format!("{}\n", serde_json::to_string(&entry)?);
        self.file.write_all(line.as_bytes())?;
        self.file.sync_all()?;

        self.sequence += 1;
        self.offset += line.len() as u64;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay all operations from the log
    pub fn replay(path: &Path) -> Result<Vec<Operation>, WalError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        Wal::open(path)?.read_new()
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WalEntry {
    seq: u64,
    op: Operation,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
