//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A cached payload together with its write time and validity window.
///
/// The store never filters on freshness; callers decide between fresh and
/// stale with [`CacheEntry::is_fresh`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Write timestamp
    pub written_at: DateTime<Utc>,
    /// Validity window, zero = never fresh
    #[serde(with = "ttl_millis")]
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry written now.
    pub fn new(value: T, ttl: Duration) -> Self {
        Self::written_at(value, Utc::now(), ttl)
    }

    /// Creates an entry with an explicit write time.
    pub fn written_at(value: T, written_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            written_at,
            ttl,
        }
    }

    // == Age ==
    /// Time elapsed since the write. A write time in the future counts as zero.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.written_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    // == Is Fresh ==
    /// Checks if the entry is still within its TTL.
    ///
    /// Boundary condition: once `age >= ttl` the entry is stale, so a zero TTL
    /// is never fresh.
    pub fn is_fresh(&self) -> bool {
        self.age() < self.ttl
    }

    // == Is Stale ==
    pub fn is_stale(&self) -> bool {
        !self.is_fresh()
    }

    // == Time To Live ==
    /// Returns the remaining freshness window, zero once stale.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }

    // == Retention ==
    /// Checks whether the entry has been stale for longer than `retention`.
    pub fn is_past_retention(&self, retention: Duration) -> bool {
        self.age() >= self.ttl.saturating_add(retention)
    }
}

// == TTL Conversion ==
/// Converts a signed millisecond TTL into a `Duration`; negatives clamp to zero.
pub fn ttl_from_millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

mod ttl_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(ttl.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
