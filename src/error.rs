//! Error types for the fetch cache
//!
//! Provides the three error families using thiserror:
//! - `StorageError` never leaves a store through its infallible methods
//! - `FetchError` is handed to the fallback resolver
//! - `ConfigError` is returned to the caller at construction time

use std::time::Duration;

use thiserror::Error;

// == Storage Error Enum ==
/// Failure inside a cache store backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Value could not be encoded as JSON
    #[error("Serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Stored entry could not be decoded
    #[error("Corrupted entry for key {key}: {reason}")]
    Corrupted { key: String, reason: String },

    /// Backend capacity ceiling reached
    #[error("Quota exceeded: {needed} bytes needed, {limit} bytes allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    /// Underlying file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding the store was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

// == Fetch Error Enum ==
/// Outcome of a producer that did not deliver a value in time.
///
/// Cloneable because a single outcome is shared with every coalesced waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The producer returned an error
    #[error("{0}")]
    Producer(String),

    /// The timer fired before the producer settled
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The producer task panicked or was cancelled
    #[error("Producer aborted: {0}")]
    Aborted(String),
}

// == Config Error Enum ==
/// Invalid caller configuration; a programming error surfaced at call time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No key was supplied
    #[error("Cache key is required")]
    MissingKey,

    /// The key is an empty string
    #[error("Cache key cannot be empty")]
    EmptyKey,

    /// The key exceeds the maximum length
    #[error("Cache key exceeds maximum length of {0} bytes")]
    KeyTooLong(usize),

    /// No timeout was supplied
    #[error("Timeout is required")]
    MissingTimeout,
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;
