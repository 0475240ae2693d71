//! Durable storage for the translation cache.
//!
//! The cache is persisted as one serialized document in a single named slot,
//! overwritten wholesale on every save.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the slot the translation cache is stored under.
pub const CACHE_SLOT: &str = "translation_cache";

/// A single string-keyed storage slot.
pub trait CacheStore: Send + Sync {
    /// Read the slot; `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the slot's content.
    fn save(&self, data: &str) -> Result<()>;

    /// Delete the slot. Removing an empty slot is not an error.
    fn remove(&self) -> Result<()>;
}

/// Slot backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store the slot as `<dir>/<CACHE_SLOT>.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", CACHE_SLOT)),
        }
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(format!("Failed to read {}", self.path.display())),
        }
    }

    fn save(&self, data: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create {}", parent.display()))?;
            }
        }

        // Write beside the target, then rename over it so readers never see a torn file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).context(format!("Failed to write {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e).context(format!("Failed to move {} into place", tmp.display()));
        }
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Process-local slot, for sessions without durable storage and for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `data` already stored
    pub fn with_data(data: &str) -> Self {
        Self {
            slot: Mutex::new(Some(data.to_string())),
        }
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&self, data: &str) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        *slot = Some(data.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}
