//! Cache Statistics Module
//!
//! Tracks how fetches were satisfied: fresh hits, fallbacks, errors and
//! producer runs.

use serde::Serialize;

// == Cache Stats ==
/// Counters describing how the orchestrator resolved requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests answered from a fresh entry
    pub hits: u64,
    /// Requests that found no fresh entry or were forced
    pub misses: u64,
    /// Fallbacks answered with a stale entry
    pub stale_served: u64,
    /// Fallbacks answered with the static default
    pub defaults_served: u64,
    /// Requests that ended with an error
    pub errors: u64,
    /// Producer invocations started
    pub producer_runs: u64,
    /// Requests that joined an in-flight producer
    pub coalesced: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Records a request answered from a fresh entry.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Records a request that had to go to the producer.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Stale ==
    /// Records a fallback to a stale entry.
    pub fn record_stale(&mut self) {
        self.stale_served += 1;
    }

    // == Record Default ==
    /// Records a fallback to the static default.
    pub fn record_default(&mut self) {
        self.defaults_served += 1;
    }

    // == Record Error ==
    /// Records a request that ended with no usable data.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    // == Record Producer Run ==
    /// Records a producer invocation.
    pub fn record_producer_run(&mut self) {
        self.producer_runs += 1;
    }

    // == Record Coalesced ==
    /// Records a request that joined a flight already running.
    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }
}
