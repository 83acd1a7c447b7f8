//! Cache Store Module
//!
//! The storage capability shared by the ephemeral and session stores.
//!
//! Implementations provide the fallible `try_*` operations. The provided
//! `get`/`set`/`delete` wrappers log and swallow every `StorageError`, so a
//! broken backend only ever looks like a cache miss to the orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::CacheEntry;
use crate::error::Result;

// == Storage Kind ==
/// Which store a fetch reads from and writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-lifetime map
    #[default]
    Ephemeral,
    /// Serialized per-session storage
    Session,
}

// == Cache Store ==
/// Key/value storage of [`CacheEntry`] values.
pub trait CacheStore<T>: Send + Sync {
    /// Reads the entry for `key` without any freshness filtering.
    fn try_get(&self, key: &str) -> Result<Option<CacheEntry<T>>>;

    /// Writes `entry` under `key`, replacing any previous entry.
    fn try_put(&self, key: &str, entry: CacheEntry<T>) -> Result<()>;

    /// Removes the entry for `key`; absent keys are not an error.
    fn try_delete(&self, key: &str) -> Result<()>;

    /// Removes entries that have been stale for longer than `retention`.
    ///
    /// Returns the number of entries removed.
    fn try_purge_expired(&self, retention: Duration) -> Result<usize>;

    // == Get ==
    /// Reads an entry, degrading any storage failure to a miss.
    fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        match self.try_get(key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    // == Put ==
    /// Writes a prepared entry, degrading any storage failure to a no-op.
    fn put(&self, key: &str, entry: CacheEntry<T>) {
        if let Err(err) = self.try_put(key, entry) {
            warn!(key, error = %err, "cache write failed, entry dropped");
        }
    }

    // == Set ==
    /// Stores `value` written now with the given TTL.
    fn set(&self, key: &str, value: T, ttl: Duration) {
        self.put(key, CacheEntry::new(value, ttl));
    }

    // == Delete ==
    fn delete(&self, key: &str) {
        if let Err(err) = self.try_delete(key) {
            warn!(key, error = %err, "cache delete failed");
        }
    }

    // == Purge Expired ==
    /// Purges long-stale entries, returning zero when the backend fails.
    fn purge_expired(&self, retention: Duration) -> usize {
        match self.try_purge_expired(retention) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(error = %err, "cache purge failed");
                0
            }
        }
    }
}
