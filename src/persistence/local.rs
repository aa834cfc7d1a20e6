//! Local Durable Storage
//!
//! `FileStore` keeps each slot in `<data_dir>/<key>.json`; writes go to a
//! temporary file first and are renamed into place, so a failed write
//! leaves the previous snapshot intact. `MemoryStore` keeps slots in a
//! shared map and counts writes per key.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::traits::KeyValueStore;
use crate::error::PersistError;

/// File-backed slots
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory slots. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemorySlots>>,
}

#[derive(Debug, Default)]
struct MemorySlots {
    values: HashMap<String, String>,
    writes: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls for `key`
    pub fn writes(&self, key: &str) -> usize {
        self.inner
            .lock()
            .map(|slots| slots.writes.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemorySlots>, PersistError> {
        self.inner
            .lock()
            .map_err(|_| PersistError::Storage("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.lock()?.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let mut slots = self.lock()?;
        slots.values.insert(key.to_string(), value.to_string());
        *slots.writes.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }
}
