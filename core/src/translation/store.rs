//! Durable stores for the translation cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::service::{CacheStore, StoreError};

/// Stores the mapping as a pretty-printed JSON object.
///
/// Entry order is preserved. Saves go to a sibling temp file first and are
/// renamed into place, so a crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "translation_cache".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<IndexMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(IndexMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Format(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, entries: &IndexMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content =
            serde_json::to_string_pretty(entries).map_err(|e| StoreError::Format(e.to_string()))?;
        let temp = self.temp_path();
        fs::write(&temp, content)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// In-memory store whose clones share the same mapping.
///
/// Useful for tests and for hosts that persist the mapping themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<IndexMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: IndexMap<String, String>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Current stored mapping.
    pub fn entries(&self) -> IndexMap<String, String> {
        self.entries.lock().clone()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<IndexMap<String, String>, StoreError> {
        Ok(self.entries.lock().clone())
    }

    fn save(&self, entries: &IndexMap<String, String>) -> Result<(), StoreError> {
        *self.entries.lock() = entries.clone();
        Ok(())
    }
}

/// Store that remembers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl CacheStore for NullStore {
    fn load(&self) -> Result<IndexMap<String, String>, StoreError> {
        Ok(IndexMap::new())
    }

    fn save(&self, _entries: &IndexMap<String, String>) -> Result<(), StoreError> {
        Ok(())
    }
}
