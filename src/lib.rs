//! Fetch Cache - A cached-fetch orchestrator
//!
//! Wraps an async producer with a TTL cache, a race against a timeout and a
//! fixed fallback order (stale entry, static default, error). Concurrent
//! requests for the same key share one producer call.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod tasks;

pub use cache::{CacheEntry, CacheStore, EphemeralStore, SessionStore, StorageKind};
pub use config::Config;
pub use error::{ConfigError, FetchError, StorageError};
pub use fetch::{CacheConfig, CachedFetch, FetchConfig, FetchState, KeyedCache, Orchestrator};
pub use tasks::{spawn_cleanup_task, spawn_orchestrator_cleanup};
