//! Keyed cache handle
//!
//! A single-key view over a cache store with a fixed TTL: `get`, `set`,
//! `clear` and `has_entry` without any fetching.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStore, StorageKind};
use crate::error::ConfigError;
use crate::fetch::config::validate_key;
use crate::fetch::Orchestrator;

// == Cache Config ==
/// Key, TTL and storage choice of a [`KeyedCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    key: String,
    ttl: Duration,
    storage: StorageKind,
}

impl CacheConfig {
    pub fn new(
        key: impl Into<String>,
        ttl: Duration,
        storage: StorageKind,
    ) -> Result<Self, ConfigError> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self { key, ttl, storage })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }
}

// == Keyed Cache ==
pub struct KeyedCache<T> {
    config: CacheConfig,
    store: Arc<dyn CacheStore<T>>,
}

impl<T> KeyedCache<T> {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore<T>>) -> Self {
        Self { config, store }
    }

    /// Returns the fresh value, if any.
    pub fn get(&self) -> Option<T> {
        self.entry()
            .filter(CacheEntry::is_fresh)
            .map(|entry| entry.value)
    }

    /// Returns the stored entry regardless of freshness.
    pub fn entry(&self) -> Option<CacheEntry<T>> {
        self.store.get(&self.config.key)
    }

    pub fn set(&self, value: T) {
        self.store.set(&self.config.key, value, self.config.ttl);
    }

    pub fn clear(&self) {
        self.store.delete(&self.config.key);
    }

    /// True when a fresh entry exists.
    pub fn has_entry(&self) -> bool {
        self.entry().is_some_and(|entry| entry.is_fresh())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl<T> Orchestrator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a [`KeyedCache`] over the store chosen by `config`.
    pub fn keyed(&self, config: CacheConfig) -> KeyedCache<T> {
        let store = Arc::clone(self.store(config.storage()));
        KeyedCache::new(config, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EphemeralStore;
    use std::thread::sleep;

    #[test]
    fn test_keyed_set_get_clear() {
        let config = CacheConfig::new("profile:1", Duration::from_secs(60), StorageKind::Ephemeral)
            .unwrap();
        let cache: KeyedCache<String> = KeyedCache::new(config, Arc::new(EphemeralStore::new()));

        assert!(!cache.has_entry());
        cache.set("alice".to_string());
        assert!(cache.has_entry());
        assert_eq!(cache.get().as_deref(), Some("alice"));

        cache.clear();
        assert!(!cache.has_entry());
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_keyed_expired_entry_is_hidden() {
        let config = CacheConfig::new("profile:1", Duration::from_millis(20), StorageKind::Ephemeral)
            .unwrap();
        let cache: KeyedCache<u32> = KeyedCache::new(config, Arc::new(EphemeralStore::new()));

        cache.set(1);
        sleep(Duration::from_millis(40));

        assert!(cache.get().is_none());
        assert!(!cache.has_entry());
        assert_eq!(cache.entry().unwrap().value, 1);
    }

    #[test]
    fn test_keyed_rejects_empty_key() {
        let result = CacheConfig::new("", Duration::from_secs(1), StorageKind::Session);
        assert_eq!(result.unwrap_err(), ConfigError::EmptyKey);
    }

    #[test]
    fn test_keyed_from_orchestrator_shares_store() {
        let orchestrator = Orchestrator::<u32>::in_memory();
        let config = CacheConfig::new("n", Duration::from_secs(60), StorageKind::Session).unwrap();

        orchestrator.keyed(config).set(5);

        assert_eq!(
            orchestrator.store(StorageKind::Session).get("n").unwrap().value,
            5
        );
    }
}
