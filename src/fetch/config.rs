//! Fetch Configuration
//!
//! Per-call parameters for a cached fetch. Built through [`FetchConfigBuilder`],
//! which rejects missing or invalid values at call time.

use std::time::Duration;

use crate::cache::{ttl_from_millis, StorageKind, MAX_KEY_LENGTH};
use crate::error::ConfigError;

/// Default TTL when the caller does not pick one (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

// == Key Validation ==
/// Checks that a cache key is non-empty and within the length limit.
pub fn validate_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::EmptyKey);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(ConfigError::KeyTooLong(MAX_KEY_LENGTH));
    }
    Ok(())
}

// == Fetch Config ==
/// Validated parameters of a cached fetch.
#[derive(Debug, Clone)]
pub struct FetchConfig<T> {
    key: String,
    ttl: Duration,
    timeout: Duration,
    storage: StorageKind,
    static_default: Option<T>,
}

impl<T> FetchConfig<T> {
    pub fn builder() -> FetchConfigBuilder<T> {
        FetchConfigBuilder::default()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    /// Value served in degraded mode when no stale entry exists.
    pub fn static_default(&self) -> Option<&T> {
        self.static_default.as_ref()
    }
}

// == Builder ==
/// Builder for [`FetchConfig`]. Key and timeout are required.
#[derive(Debug)]
pub struct FetchConfigBuilder<T> {
    key: Option<String>,
    ttl: Duration,
    timeout: Option<Duration>,
    storage: StorageKind,
    static_default: Option<T>,
}

impl<T> Default for FetchConfigBuilder<T> {
    fn default() -> Self {
        Self {
            key: None,
            ttl: DEFAULT_TTL,
            timeout: None,
            storage: StorageKind::default(),
            static_default: None,
        }
    }
}

impl<T> FetchConfigBuilder<T> {
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the TTL. Zero disables fresh hits.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the TTL from signed milliseconds; negative values mean "never cache".
    pub fn ttl_millis(mut self, ms: i64) -> Self {
        self.ttl = ttl_from_millis(ms);
        self
    }

    /// Sets how long to wait for the producer before falling back.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn static_default(mut self, value: T) -> Self {
        self.static_default = Some(value);
        self
    }

    // == Build ==
    pub fn build(self) -> Result<FetchConfig<T>, ConfigError> {
        let key = self.key.ok_or(ConfigError::MissingKey)?;
        validate_key(&key)?;
        let timeout = self.timeout.ok_or(ConfigError::MissingTimeout)?;

        Ok(FetchConfig {
            key,
            ttl: self.ttl,
            timeout,
            storage: self.storage,
            static_default: self.static_default,
        })
    }
}
