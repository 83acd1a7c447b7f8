//! Ephemeral Store Module
//!
//! Process-lifetime cache backed by an in-memory map.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStore};
use crate::error::{Result, StorageError};

// == Ephemeral Store ==
/// In-process key to entry map. Lost when the process exits.
#[derive(Debug)]
pub struct EphemeralStore<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T> EphemeralStore<T> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    // == Length ==
    /// Returns the number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for EphemeralStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CacheStore<T> for EphemeralStore<T>
where
    T: Clone + Send + Sync,
{
    fn try_get(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn try_put(&self, key: &str, entry: CacheEntry<T>) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn try_delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn try_purge_expired(&self, retention: Duration) -> Result<usize> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_past_retention(retention));
        Ok(before - entries.len())
    }
}
