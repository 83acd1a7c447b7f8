//! Session Store Module
//!
//! Durable cache that serializes entries to JSON strings and writes them
//! through a key/string [`SessionBackend`].
//!
//! Two backends are provided:
//! - [`MemoryBackend`]: in-process storage with a byte quota
//! - [`FileBackend`]: one JSON document on disk; survives a process restart
//!   and ends when the session file is cleared

use std::collections::HashMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::error::{Result, StorageError};

// == Session Backend ==
/// A key/string storage API with `getItem`/`setItem`/`removeItem` semantics.
pub trait SessionBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value`, failing with `QuotaExceeded` past the capacity ceiling.
    fn set_item(&self, key: &str, value: String) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;

    /// Lists every stored key.
    fn keys(&self) -> Result<Vec<String>>;

    /// Ends the session, dropping all items.
    fn clear(&self) -> Result<()>;
}

/// Rejects a write that would take the item map past `limit` bytes.
fn check_quota(
    items: &HashMap<String, String>,
    key: &str,
    value: &str,
    limit: Option<usize>,
) -> Result<()> {
    let Some(limit) = limit else {
        return Ok(());
    };

    let current: usize = items
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
    let needed = current + key.len() + value.len();

    if needed > limit {
        return Err(StorageError::QuotaExceeded { needed, limit });
    }
    Ok(())
}

// == Memory Backend ==
/// In-process session backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl SessionBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        check_quota(&items, key, &value, self.quota_bytes)?;
        items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.keys().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.clear();
        Ok(())
    }
}

// == File Backend ==
/// Session backend persisted as a single JSON object on disk.
///
/// Every mutation rewrites the file through a temporary sibling and a rename,
/// so a reader never observes a partial write.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl FileBackend {
    // == Open ==
    /// Opens the session file at `path`, starting empty if it is missing.
    ///
    /// A file that cannot be parsed is discarded rather than failing the open.
    pub fn open(path: impl AsRef<Path>, quota_bytes: Option<usize>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let items: HashMap<String, String> = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "discarding corrupted session file");
                HashMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), items = items.len(), "session file opened");

        Ok(Self {
            path,
            items: Mutex::new(items),
            quota_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string(items).map_err(StorageError::Serialization)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        check_quota(&items, key, &value, self.quota_bytes)?;

        let previous = items.insert(key.to_string(), value);
        if let Err(err) = self.persist(&items) {
            // Keep memory and disk in agreement
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        if items.remove(key).is_some() {
            self.persist(&items)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.keys().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// == Session Store ==
/// Durable cache store writing JSON-encoded entries to a [`SessionBackend`].
pub struct SessionStore<T> {
    backend: Arc<dyn SessionBackend>,
    _value: PhantomData<fn() -> T>,
}

impl<T> SessionStore<T> {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            _value: PhantomData,
        }
    }

    /// Returns the shared backend.
    pub fn backend(&self) -> &Arc<dyn SessionBackend> {
        &self.backend
    }
}

impl<T> Clone for SessionStore<T> {
    fn clone(&self) -> Self {
        Self::new(self.backend.clone())
    }
}

impl<T> CacheStore<T> for SessionStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn try_get(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
        let Some(raw) = self.backend.get_item(key)? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StorageError::Corrupted {
                key: key.to_string(),
                reason: err.to_string(),
            })
    }

    fn try_put(&self, key: &str, entry: CacheEntry<T>) -> Result<()> {
        let raw = serde_json::to_string(&entry).map_err(StorageError::Serialization)?;
        self.backend.set_item(key, raw)
    }

    fn try_delete(&self, key: &str) -> Result<()> {
        self.backend.remove_item(key)
    }

    fn try_purge_expired(&self, retention: Duration) -> Result<usize> {
        let mut removed = 0;

        for key in self.backend.keys()? {
            let Some(raw) = self.backend.get_item(&key)? else {
                continue;
            };
            // Other value types may share the backend, so decode loosely
            let expired = match serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) {
                Ok(entry) => entry.is_past_retention(retention),
                Err(_) => true,
            };
            if expired {
                self.backend.remove_item(&key)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}
