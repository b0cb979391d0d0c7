//! Key/value storage that never fails the caller.
//!
//! Backends report errors honestly through [`KeyValueBackend`]; the
//! [`SafeStorage`] facade swallows them so a blocked or full store degrades
//! to "nothing saved" instead of an error path in the UI.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage is blocked or disabled.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Writing would exceed the configured quota.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        needed: usize,
        /// Maximum bytes allowed.
        quota: usize,
    },
    /// Underlying file error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The backing file is not a JSON object of strings.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias for backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A persistent string-to-string store.
pub trait KeyValueBackend: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-process store, optionally bounded by total key+value bytes.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryBackend {
    /// Create an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes past `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: DashMap::new(),
            quota: Some(quota),
        }
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.key() != key)
            .map(|entry| entry.key().len() + entry.value().len())
            .sum()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(quota) = self.quota {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Use `path` as the backing file. It is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))?;
        let mut entries = self.load()?;
        apply(&mut entries);
        self.store(&entries)
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Backend that refuses every access, as storage does in locked-down modes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledBackend;

impl KeyValueBackend for DisabledBackend {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable("storage is disabled".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage is disabled".to_string()))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage is disabled".to_string()))
    }
}

/// Fail-silent facade over a [`KeyValueBackend`].
#[derive(Clone)]
pub struct SafeStorage {
    backend: Arc<dyn KeyValueBackend>,
}

impl SafeStorage {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Unbounded in-memory storage.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Storage persisted to a JSON file.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(path))
    }

    /// Storage that is always unavailable.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(DisabledBackend)
    }

    /// Read a value; `None` when missing or unreadable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                debug!(key, error = %err, "storage read ignored");
                None
            }
        }
    }

    /// Write a value; failures are dropped.
    pub fn set(&self, key: &str, value: &str) {
        if let Err(err) = self.backend.set(key, value) {
            debug!(key, error = %err, "storage write ignored");
        }
    }

    /// Delete a value; failures are dropped.
    pub fn remove(&self, key: &str) {
        if let Err(err) = self.backend.remove(key) {
            debug!(key, error = %err, "storage remove ignored");
        }
    }
}

impl std::fmt::Debug for SafeStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeStorage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let storage = SafeStorage::memory();
        assert_eq!(storage.get("consent"), None);
        storage.set("consent", "granted");
        assert_eq!(storage.get("consent").as_deref(), Some("granted"));
        storage.remove("consent");
        assert_eq!(storage.get("consent"), None);
    }

    #[test]
    fn test_disabled_storage_reads_none() {
        let storage = SafeStorage::disabled();
        storage.set("consent", "granted");
        assert_eq!(storage.get("consent"), None);
        storage.remove("consent");
    }

    #[test]
    fn test_quota_exceeded_is_swallowed() {
        let backend = MemoryBackend::with_quota(16);
        assert!(matches!(
            backend.set("k", &"x".repeat(32)),
            Err(StorageError::QuotaExceeded { quota: 16, .. })
        ));

        let storage = SafeStorage::new(MemoryBackend::with_quota(16));
        storage.set("k", "small");
        storage.set("k", &"x".repeat(32));
        assert_eq!(storage.get("k").as_deref(), Some("small"));
    }

    #[test]
    fn test_quota_counts_replaced_value_once() {
        let backend = MemoryBackend::with_quota(10);
        backend.set("key", "12345").unwrap();
        backend.set("key", "1234567").unwrap();
        assert_eq!(backend.get("key").unwrap().as_deref(), Some("1234567"));
    }

    #[test]
    fn test_file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let first = SafeStorage::file(&path);
        first.set("ui.sidebar.collapsed", "true");
        first.set("consent", "denied");
        first.remove("consent");

        let second = FileBackend::new(&path);
        assert_eq!(
            second.get("ui.sidebar.collapsed").unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(second.get("consent").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ not json").unwrap();

        let backend = FileBackend::new(&path);
        assert!(matches!(backend.get("consent"), Err(StorageError::Serialization(_))));

        let storage = SafeStorage::file(&path);
        assert_eq!(storage.get("consent"), None);
    }
}
