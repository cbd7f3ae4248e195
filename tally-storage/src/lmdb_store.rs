//! LMDB-backed partition store.
//!
//! Uses the heed crate (Rust bindings for LMDB). Every partition is an LMDB
//! named database; the name is the canonical string of a complete
//! [`AnalysisKey`]. Values inside a partition are JSON-encoded entries.
//!
//! # Access Modes
//!
//! - [`PartitionStore::create`] builds a new environment; partitions are
//!   created on demand.
//! - [`PartitionStore::open_read_only`] opens an existing environment with
//!   `READ_ONLY`; only existing partitions can be opened.
//!
//! The store is shared through `Arc`. Caches hold a handle but never close
//! the store; the environment is closed when the last handle is dropped.
//! A path can be held by at most one open store per process: `create` and
//! `open_read_only` refuse a path whose store is still open.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heed::types::{Bytes, DecodeIgnore, Str};
use heed::{Database, Env, EnvFlags, EnvOpenOptions};
use serde::{de::DeserializeOwned, Serialize};
use tally_core::{AnalysisKey, StorageError, TallyError, TallyResult};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;

const DATA_FILE: &str = "data.mdb";
const LOCK_FILE: &str = "lock.mdb";

/// Canonical paths of the stores open in this process.
static OPEN_STORES: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

fn open_stores() -> MutexGuard<'static, Vec<PathBuf>> {
    OPEN_STORES.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open or create a named database.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// No store exists at the path.
    #[error("No partition store at {0}")]
    NotFound(PathBuf),

    /// A store already exists at the path.
    #[error("Partition store already exists at {0}")]
    AlreadyExists(PathBuf),

    /// The store at the path is still open in this process.
    #[error("Partition store at {0} is still open")]
    StillOpen(PathBuf),

    /// The environment has been closed.
    #[error("Partition store environment is closed")]
    Closed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert LmdbStoreError to TallyError.
impl From<LmdbStoreError> for TallyError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Serialization(_) | LmdbStoreError::Deserialization(_) => {
                TallyError::Storage(StorageError::Codec {
                    reason: e.to_string(),
                })
            }
            _ => TallyError::Storage(StorageError::BackingResource {
                reason: e.to_string(),
            }),
        }
    }
}

fn txn_error(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

fn db_error(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::DbOpen(e.to_string())
}

/// How a store was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Newly created store; partitions are created on demand.
    Write,
    /// Existing store opened read-only.
    ReadOnly,
}

/// Durable store of named partitions.
pub struct PartitionStore {
    /// Taken on drop to close the environment.
    env: Option<Env>,
    /// Canonical path of the store directory.
    path: PathBuf,
    mode: AccessMode,
}

impl fmt::Debug for PartitionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionStore")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish()
    }
}

impl PartitionStore {
    /// Create a new store in the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The store at `path` is still open in this process
    /// - A store already exists at `path` and `overwrite_existing` is not set
    /// - The directory cannot be created
    /// - The LMDB environment cannot be opened
    pub fn create<P: AsRef<Path>>(path: P, config: &StoreConfig) -> TallyResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(path.as_ref()).map_err(LmdbStoreError::from)?;
        let path = path.as_ref().canonicalize().map_err(LmdbStoreError::from)?;

        let mut open = open_stores();
        if open.contains(&path) {
            return Err(LmdbStoreError::StillOpen(path).into());
        }

        let data_file = path.join(DATA_FILE);
        if data_file.exists() {
            if !config.overwrite_existing {
                return Err(LmdbStoreError::AlreadyExists(path).into());
            }
            warn!(path = %path.display(), "removing existing partition store");
            std::fs::remove_file(&data_file).map_err(LmdbStoreError::from)?;
            let lock_file = path.join(LOCK_FILE);
            if lock_file.exists() {
                std::fs::remove_file(&lock_file).map_err(LmdbStoreError::from)?;
            }
        }

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size_bytes())
                .max_dbs(config.max_partitions)
                .open(&path)
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        open.push(path.clone());
        info!(path = %path.display(), "created partition store");
        Ok(Self {
            env: Some(env),
            path,
            mode: AccessMode::Write,
        })
    }

    /// Open an existing store at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if no store exists at `path`, the store is still
    /// open in this process, or the LMDB environment cannot be opened.
    pub fn open_read_only<P: AsRef<Path>>(path: P, config: &StoreConfig) -> TallyResult<Self> {
        config.validate()?;
        let path = path.as_ref();

        if !path.join(DATA_FILE).exists() {
            return Err(LmdbStoreError::NotFound(path.to_path_buf()).into());
        }
        let path = path.canonicalize().map_err(LmdbStoreError::from)?;

        let mut open = open_stores();
        if open.contains(&path) {
            return Err(LmdbStoreError::StillOpen(path).into());
        }

        let mut options = EnvOpenOptions::new();
        options
            .map_size(config.map_size_bytes())
            .max_dbs(config.max_partitions);
        let env = unsafe {
            options.flags(EnvFlags::READ_ONLY);
            options.open(&path)
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        open.push(path.clone());
        info!(path = %path.display(), "opened partition store read-only");
        Ok(Self {
            env: Some(env),
            path,
            mode: AccessMode::ReadOnly,
        })
    }

    fn env(&self) -> Result<&Env, LmdbStoreError> {
        self.env.as_ref().ok_or(LmdbStoreError::Closed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == AccessMode::ReadOnly
    }

    /// Names of all partitions in the store, in LMDB key order.
    pub fn partition_names(&self) -> TallyResult<Vec<String>> {
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(txn_error)?;
        let main: Option<Database<Str, DecodeIgnore>> =
            env.open_database(&rtxn, None).map_err(db_error)?;

        let mut names = Vec::new();
        if let Some(main) = main {
            for entry in main.iter(&rtxn).map_err(txn_error)? {
                let (name, ()) = entry.map_err(txn_error)?;
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    pub fn has_partition(&self, name: &str) -> TallyResult<bool> {
        Ok(self.partition_names()?.iter().any(|n| n == name))
    }

    /// Keys recovered from partition names. Names that do not parse are
    /// skipped.
    pub fn keys(&self) -> TallyResult<Vec<AnalysisKey>> {
        let mut keys = Vec::new();
        for name in self.partition_names()? {
            match name.parse::<AnalysisKey>() {
                Ok(key) => keys.push(key),
                Err(e) => warn!(partition = %name, error = %e, "skipping foreign partition"),
            }
        }
        Ok(keys)
    }

    /// Obtain the partition `name`: created in write mode, opened in
    /// read-only mode.
    pub fn partition(self: &Arc<Self>, name: &str) -> TallyResult<Partition> {
        match self.mode {
            AccessMode::Write => self.create_partition(name),
            AccessMode::ReadOnly => self.open_partition(name),
        }
    }

    fn create_partition(self: &Arc<Self>, name: &str) -> TallyResult<Partition> {
        let env = self.env()?;
        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some(name))
            .map_err(db_error)?;
        wtxn.commit().map_err(txn_error)?;

        Ok(Partition {
            store: Arc::clone(self),
            name: name.to_string(),
            db,
        })
    }

    fn open_partition(self: &Arc<Self>, name: &str) -> TallyResult<Partition> {
        let env = self.env()?;
        let rtxn = env.read_txn().map_err(txn_error)?;
        let db: Option<Database<Str, Bytes>> =
            env.open_database(&rtxn, Some(name)).map_err(db_error)?;
        // Committing keeps the database handle valid past this transaction.
        rtxn.commit().map_err(txn_error)?;

        match db {
            Some(db) => Ok(Partition {
                store: Arc::clone(self),
                name: name.to_string(),
                db,
            }),
            None => Err(StorageError::PartitionNotFound {
                name: name.to_string(),
            }
            .into()),
        }
    }
}

impl Drop for PartitionStore {
    fn drop(&mut self) {
        if let Some(env) = self.env.take() {
            env.prepare_for_closing().wait();
        }
        open_stores().retain(|p| p != &self.path);
        debug!(path = %self.path.display(), "closed partition store");
    }
}

/// Handle to one named partition of a [`PartitionStore`].
///
/// Entries are JSON-encoded values stored under string names.
pub struct Partition {
    store: Arc<PartitionStore>,
    name: String,
    db: Database<Str, Bytes>,
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("name", &self.name)
            .field("mode", &self.store.mode)
            .finish()
    }
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_read_only(&self) -> bool {
        self.store.is_read_only()
    }

    /// Store `value` under `entry`, replacing any previous value.
    pub fn put<T: Serialize + ?Sized>(&self, entry: &str, value: &T) -> TallyResult<()> {
        if self.is_read_only() {
            return Err(StorageError::ReadOnly {
                operation: format!("write entry '{}' in partition '{}'", entry, self.name),
            }
            .into());
        }

        let bytes = serde_json::to_vec(value)
            .map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;

        let mut wtxn = self.store.env()?.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, entry, bytes.as_slice())
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(())
    }

    /// Read the value stored under `entry`.
    pub fn get<T: DeserializeOwned>(&self, entry: &str) -> TallyResult<Option<T>> {
        let rtxn = self.store.env()?.read_txn().map_err(txn_error)?;
        match self.db.get(&rtxn, entry).map_err(txn_error)? {
            Some(bytes) => {
                let value = serde_json::from_slice(bytes)
                    .map_err(|e| LmdbStoreError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Names of all entries in this partition.
    pub fn entry_names(&self) -> TallyResult<Vec<String>> {
        let rtxn = self.store.env()?.read_txn().map_err(txn_error)?;
        let mut names = Vec::new();
        for entry in self.db.iter(&rtxn).map_err(txn_error)? {
            let (name, _) = entry.map_err(txn_error)?;
            names.push(name.to_string());
        }
        Ok(names)
    }

    pub fn len(&self) -> TallyResult<u64> {
        let rtxn = self.store.env()?.read_txn().map_err(txn_error)?;
        Ok(self.db.len(&rtxn).map_err(txn_error)?)
    }

    pub fn is_empty(&self) -> TallyResult<bool> {
        Ok(self.len()? == 0)
    }
}
