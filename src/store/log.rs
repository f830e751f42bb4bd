//! Persistence Log
//!
//! Append-only text log of store mutations, one record per line:
//!
//! ```text
//! counter=42        (Number insert)
//! x=y               (Alias insert)
//! x=~               (Tombstone: delete on replay)
//! ```
//!
//! Replaying the full ordered log from an empty table reproduces the
//! live store. Dump and load files use the identical line format.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::LogSyncStrategy;
use crate::error::{Result, VaultError};

use super::table::{is_valid_name, Value, VarTable};

/// Name of the persistence log inside the data directory.
pub const LOG_FILENAME: &str = "log.txt";

// =============================================================================
// Log Records
// =============================================================================

/// One logged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// `key=<int>`
    Number { key: String, value: i64 },

    /// `key=<name>`
    Alias { key: String, target: String },

    /// `key=~`
    Tombstone { key: String },
}

impl LogRecord {
    /// The record that persists an insert of `value` under `key`.
    pub fn for_insert(key: &str, value: &Value) -> Self {
        match value {
            Value::Number(v) => LogRecord::Number {
                key: key.to_string(),
                value: *v,
            },
            Value::Alias(target) => LogRecord::Alias {
                key: key.to_string(),
                target: target.clone(),
            },
        }
    }

    /// Parse one log line. The key and any alias target are validated
    /// exactly as at insert time.
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("missing '=' in record '{}'", line))?;

        if !is_valid_name(key) {
            return Err(format!("invalid key '{}'", key));
        }

        if value == "~" {
            return Ok(LogRecord::Tombstone {
                key: key.to_string(),
            });
        }

        if let Ok(number) = value.parse::<i64>() {
            return Ok(LogRecord::Number {
                key: key.to_string(),
                value: number,
            });
        }

        if is_valid_name(value) {
            return Ok(LogRecord::Alias {
                key: key.to_string(),
                target: value.to_string(),
            });
        }

        Err(format!("invalid value '{}' for key '{}'", value, key))
    }

    /// Apply this record against a live table. A tombstone for a
    /// missing key is a no-op.
    pub fn apply(&self, table: &mut VarTable) {
        match self {
            LogRecord::Number { key, value } => table.insert(key, Value::Number(*value)),
            LogRecord::Alias { key, target } => table.insert(key, Value::Alias(target.clone())),
            LogRecord::Tombstone { key } => {
                table.remove(key);
            }
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRecord::Number { key, value } => write!(f, "{}={}", key, value),
            LogRecord::Alias { key, target } => write!(f, "{}={}", key, target),
            LogRecord::Tombstone { key } => write!(f, "{}=~", key),
        }
    }
}

// =============================================================================
// Log Writer
// =============================================================================

/// Appends records to the persistence log.
pub struct LogWriter {
    file: File,
    path: PathBuf,
    strategy: LogSyncStrategy,
    unsynced: usize,
}

impl LogWriter {
    /// Open or create the log file in append mode.
    pub fn open(path: &Path, strategy: LogSyncStrategy) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            strategy,
            unsynced: 0,
        })
    }

    /// Append one record and apply the sync strategy.
    pub fn append(&mut self, record: &LogRecord) -> std::io::Result<()> {
        writeln!(self.file, "{}", record)?;
        self.unsynced += 1;

        match self.strategy {
            LogSyncStrategy::EveryWrite => self.sync()?,
            LogSyncStrategy::EveryNRecords { count } => {
                if self.unsynced >= count {
                    self.sync()?;
                }
            }
        }

        Ok(())
    }

    /// Force the log to disk.
    pub fn sync(&mut self) -> std::io::Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Truncate the log to empty (used by the clear operation).
    pub fn truncate(&mut self) -> std::io::Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.unsynced = 0;
        Ok(())
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// =============================================================================
// Replay
// =============================================================================

/// Read every record from a log file, in order.
///
/// A malformed line is fatal here: the log is the durable source of
/// truth, and skipping records would silently diverge the replayed
/// store from the logged one. Blank lines are tolerated.
pub fn read_records(path: &Path) -> Result<Vec<LogRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let record = LogRecord::parse(&line)
            .map_err(|e| VaultError::Replay(format!("line {}: {}", lineno + 1, e)))?;
        records.push(record);
    }

    Ok(records)
}
