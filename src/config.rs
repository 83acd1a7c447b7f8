//! Configuration Module
//!
//! Loads the process-wide cache settings from environment variables. Per-fetch
//! parameters (key, TTL, timeout) are always explicit in `FetchConfig`.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{FileBackend, MemoryBackend, SessionBackend, DEFAULT_SESSION_QUOTA};
use crate::error::Result;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// File backing the session store; in-memory when unset
    pub session_store_path: Option<PathBuf>,
    /// Session store capacity ceiling in bytes
    pub session_quota_bytes: usize,
    /// Seconds an entry is kept past its TTL for stale fallback
    pub stale_retention: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SESSION_STORE_PATH` - Session file path (default: unset, in-memory)
    /// - `SESSION_QUOTA_BYTES` - Session capacity in bytes (default: 5 MiB)
    /// - `STALE_RETENTION_SECS` - Stale retention in seconds (default: 3600)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            session_store_path: env::var("SESSION_STORE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            session_quota_bytes: env::var("SESSION_QUOTA_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_quota_bytes),
            stale_retention: env::var("STALE_RETENTION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.stale_retention),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    pub fn stale_retention(&self) -> Duration {
        Duration::from_secs(self.stale_retention)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    /// Builds the configured session backend.
    pub fn session_backend(&self) -> Result<Arc<dyn SessionBackend>> {
        let backend: Arc<dyn SessionBackend> = match &self.session_store_path {
            Some(path) => Arc::new(FileBackend::open(path, Some(self.session_quota_bytes))?),
            None => Arc::new(MemoryBackend::with_quota(self.session_quota_bytes)),
        };
        Ok(backend)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_store_path: None,
            session_quota_bytes: DEFAULT_SESSION_QUOTA,
            stale_retention: 3600,
            cleanup_interval: 60,
        }
    }
}
