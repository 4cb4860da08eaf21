//! Persistent setting storage.
//!
//! This module provides a trait for reading and writing one integer setting
//! by key, plus a memory-based implementation for testing and a JSON
//! file-backed implementation.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

/// Setting store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O failed for {path}: {source}")]
    Io {
        /// Path of the backing file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The backing file is not a valid settings document.
    #[error("invalid settings file {path}: {source}")]
    Parse {
        /// Path of the backing file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Trait for the on-device key-value store holding the setting.
#[async_trait]
pub trait SettingStore: Send + Sync {
    /// Read the integer stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// Write `value` under `key`.
    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError>;
}

/// In-memory setting store for testing.
///
/// Counts writes so callers can verify that redundant updates are skipped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    values: HashMap<String, i64>,
    writes: usize,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one value.
    pub fn with_value(key: &str, value: i64) -> Self {
        let store = Self::new();
        store.lock().values.insert(key.to_string(), value);
        store
    }

    /// Current value under `key`.
    pub fn value(&self, key: &str) -> Option<i64> {
        self.lock().values.get(key).copied()
    }

    /// Number of `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SettingStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.values.insert(key.to_string(), value);
        inner.writes += 1;
        Ok(())
    }
}

/// Setting store backed by a JSON object on disk.
///
/// The file maps keys to integers, e.g. `{ "hapticIntervalMinutes": 5 }`.
/// A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl FileStore {
    /// Default file name inside a data directory.
    pub const FILE_NAME: &'static str = "settings.json";

    /// Create a store for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Create a store for `settings.json` inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl SettingStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.read_all().await?.get(key).copied())
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut values = match self.read_all().await {
            Ok(values) => values,
            Err(e @ StoreError::Parse { .. }) => {
                tracing::warn!("Overwriting unreadable settings: {}", e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value);

        let contents = serde_json::to_string_pretty(&values).map_err(|source| {
            StoreError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        // Write beside the target and rename so a crash never truncates it.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, contents)
            .await
            .map_err(|source| StoreError::Io {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }
}
