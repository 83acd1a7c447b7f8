//! Cache Module
//!
//! Provides cache entries with TTL freshness and the two interchangeable
//! stores: ephemeral (process lifetime) and session (serialized).

mod entry;
mod ephemeral;
mod session;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{ttl_from_millis, CacheEntry};
pub use ephemeral::EphemeralStore;
pub use session::{FileBackend, MemoryBackend, SessionBackend, SessionStore};
pub use stats::CacheStats;
pub use store::{CacheStore, StorageKind};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Default session capacity ceiling in bytes
pub const DEFAULT_SESSION_QUOTA: usize = 5 * 1024 * 1024; // 5 MiB
