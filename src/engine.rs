//! Engine Module
//!
//! The process-wide store singleton that coordinates the variable table
//! and the persistence log.
//!
//! ## Responsibilities
//! - Replay the persistence log on startup, before connections are accepted
//! - Resolve operands (literal, named, or alias-chained)
//! - Apply mutations and log them in the same critical section
//! - Bulk operations: dump, load, clear
//!
//! ## Concurrency Model
//!
//! One store mutex guards the table and the log together. Operand
//! resolution, arithmetic result storage, and the log append for a
//! request happen inside a single critical section, so no other request
//! ever observes a partially-applied mutation. Workers never hold the
//! handoff mutex while calling into the engine.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{RequestError, Result};
use crate::math::{self, ArithOp};
use crate::store::{read_records, resolve, LogRecord, LogWriter, Value, VarTable, LOG_FILENAME};

/// One request operand: a literal value or a variable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(i64),
    Name(String),
}

/// The variable store engine.
pub struct Engine {
    config: Config,
    log_path: PathBuf,
    inner: Mutex<EngineInner>,
}

struct EngineInner {
    table: VarTable,
    log: LogWriter,
}

impl Engine {
    /// Open the engine: create the data directory, replay the
    /// persistence log, and get ready to serve requests.
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let log_path = config.data_dir.join(LOG_FILENAME);

        let mut table = VarTable::new(config.buckets);

        if log_path.exists() {
            let records = read_records(&log_path)?;
            for record in &records {
                record.apply(&mut table);
            }
            if !records.is_empty() {
                tracing::info!(
                    "replayed {} log records ({} live entries)",
                    records.len(),
                    table.len()
                );
            }
        }

        let log = LogWriter::open(&log_path, config.log_sync_strategy)?;

        Ok(Self {
            config,
            log_path,
            inner: Mutex::new(EngineInner { table, log }),
        })
    }

    /// Open with a path (convenience method for tests)
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    // =========================================================================
    // Request Operations
    // =========================================================================

    /// Arithmetic with store-backed operands and/or a result target.
    ///
    /// Resolution, computation, result storage, and the log append all
    /// run under one acquisition of the store mutex. Pure-literal
    /// arithmetic without a target should call `math::apply` directly
    /// and skip the lock entirely.
    pub fn arithmetic(
        &self,
        op: ArithOp,
        a: &Operand,
        b: &Operand,
        target: Option<&str>,
        recursive: bool,
    ) -> std::result::Result<i64, RequestError> {
        let mut inner = self.inner.lock();

        let va = inner.resolve_operand(a, recursive, self.config.max_hops)?;
        let vb = inner.resolve_operand(b, recursive, self.config.max_hops)?;
        let result = math::apply(op, va, vb)?;

        if let Some(key) = target {
            let record = LogRecord::Number {
                key: key.to_string(),
                value: result,
            };
            inner.log.append(&record)?;
            inner.table.insert(key, Value::Number(result));
        }

        Ok(result)
    }

    /// The target name of an alias entry.
    pub fn get_alias(&self, key: &str) -> std::result::Result<String, RequestError> {
        let inner = self.inner.lock();
        match inner.table.get(key) {
            None => Err(RequestError::NotFound),
            Some(Value::Number(_)) => Err(RequestError::TypeMismatch),
            Some(Value::Alias(target)) => Ok(target.clone()),
        }
    }

    /// Store `key` as an alias pointing at `target` and log it.
    ///
    /// The target is not required to exist; dangling aliases only fail
    /// at resolution time.
    pub fn set_alias(&self, key: &str, target: &str) -> std::result::Result<(), RequestError> {
        let mut inner = self.inner.lock();
        let record = LogRecord::Alias {
            key: key.to_string(),
            target: target.to_string(),
        };
        inner.log.append(&record)?;
        inner.table.insert(key, Value::Alias(target.to_string()));
        Ok(())
    }

    /// Delete an entry and log a tombstone.
    pub fn delete(&self, key: &str) -> std::result::Result<(), RequestError> {
        let mut inner = self.inner.lock();

        if inner.table.get(key).is_none() {
            return Err(RequestError::NotFound);
        }

        let record = LogRecord::Tombstone {
            key: key.to_string(),
        };
        inner.log.append(&record)?;
        inner.table.remove(key);
        Ok(())
    }

    // =========================================================================
    // Bulk Operations
    // =========================================================================

    /// Write every live entry to a new file in log-record format.
    /// Fails if the file already exists.
    pub fn dump(&self, path: &Path) -> std::result::Result<(), RequestError> {
        let inner = self.inner.lock();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(RequestError::from_fs)?;

        for (key, value) in inner.table.iter() {
            writeln!(file, "{}", LogRecord::for_insert(key, value))?;
        }
        file.sync_data()?;

        Ok(())
    }

    /// Apply a file of log records against the live store, mirroring
    /// each applied record into the persistence log.
    ///
    /// A malformed line stops the load with InvalidArgument; records
    /// before it remain applied.
    pub fn load(&self, path: &Path) -> std::result::Result<(), RequestError> {
        let file = fs::File::open(path).map_err(RequestError::from_fs)?;
        let reader = BufReader::new(file);

        let mut inner = self.inner.lock();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record =
                LogRecord::parse(&line).map_err(|_| RequestError::InvalidArgument)?;
            inner.log.append(&record)?;
            record.apply(&mut inner.table);
        }

        Ok(())
    }

    /// Remove every entry and truncate the persistence log.
    pub fn clear(&self) -> std::result::Result<(), RequestError> {
        let mut inner = self.inner.lock();
        inner.table.clear();
        inner.log.truncate()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Current value of a key, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().table.get(key).cloned()
    }

    /// Number of live entries.
    pub fn entry_count(&self) -> usize {
        self.inner.lock().table.len()
    }

    /// Path of the persistence log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Engine configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl EngineInner {
    /// Resolve one operand to its numeric value.
    ///
    /// Named operands are looked up under the already-held store lock;
    /// alias entries resolve through the chain walker only when the
    /// request allows recursion.
    fn resolve_operand(
        &self,
        operand: &Operand,
        recursive: bool,
        max_hops: u64,
    ) -> std::result::Result<i64, RequestError> {
        match operand {
            Operand::Literal(v) => Ok(*v),
            Operand::Name(name) => match self.table.get(name) {
                None => Err(RequestError::NotFound),
                Some(Value::Number(v)) => Ok(*v),
                Some(Value::Alias(_)) => {
                    if !recursive {
                        return Err(RequestError::TypeMismatch);
                    }
                    resolve(&self.table, name, max_hops)
                }
            },
        }
    }
}
