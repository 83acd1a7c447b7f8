//! Cached Fetch Orchestrator
//!
//! Resolves a keyed fetch against a cache store, racing the producer against a
//! timeout and falling back to stale data or a static default.
//!
//! # Flights
//! Each producer invocation runs in its own spawned task (a "flight"). The task
//! writes a successful result to the store before it completes, so a result
//! that arrives after the caller timed out is still committed. Waiters hold a
//! [`Shared`] handle to the flight's outcome; concurrent non-forced requests for
//! the same key join the registered flight instead of starting another.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{
    CacheEntry, CacheStats, CacheStore, EphemeralStore, MemoryBackend, SessionStore, StorageKind,
};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::fetch::{Fallback, FallbackResolver, FetchConfig, FetchState};

type Flight<T> = Shared<BoxFuture<'static, std::result::Result<T, FetchError>>>;
type FlightKey = (StorageKind, String);
type Registry<T> = Mutex<HashMap<FlightKey, InFlight<T>>>;

struct InFlight<T> {
    id: u64,
    flight: Flight<T>,
}

/// Removes a flight from the registry when its task ends, including by panic.
struct FlightGuard<T> {
    registry: Arc<Registry<T>>,
    key: FlightKey,
    id: u64,
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // A forced flight is never registered, and a newer flight may own the key
        if registry.get(&self.key).is_some_and(|f| f.id == self.id) {
            registry.remove(&self.key);
        }
    }
}

/// Outcome of the synchronous half of a resolve.
pub(crate) enum Resolution<T> {
    Ready(FetchState<T>),
    Pending(PendingFetch<T>),
}

/// A started flight plus the entry that was in the store when it began.
pub(crate) struct PendingFetch<T> {
    flight: Flight<T>,
    existing: Option<CacheEntry<T>>,
}

impl<T> PendingFetch<T> {
    /// The stored entry, usually stale, seen when the flight began.
    pub(crate) fn stale_value(&self) -> Option<&T> {
        self.existing.as_ref().map(|entry| &entry.value)
    }
}

struct Inner<T> {
    ephemeral: Arc<dyn CacheStore<T>>,
    session: Arc<dyn CacheStore<T>>,
    in_flight: Arc<Registry<T>>,
    next_flight: AtomicU64,
    stats: Mutex<CacheStats>,
}

// == Orchestrator ==
/// Cached-fetch engine over an ephemeral and a session store.
///
/// Cloning is cheap and clones share stores, in-flight registry and stats.
pub struct Orchestrator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Orchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Orchestrator<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an orchestrator over explicitly injected stores.
    pub fn new(ephemeral: Arc<dyn CacheStore<T>>, session: Arc<dyn CacheStore<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                ephemeral,
                session,
                in_flight: Arc::new(Mutex::new(HashMap::new())),
                next_flight: AtomicU64::new(0),
                stats: Mutex::new(CacheStats::new()),
            }),
        }
    }

    /// Creates an orchestrator with a fresh ephemeral store and an in-memory
    /// session backend.
    pub fn in_memory() -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        Self::new(
            Arc::new(EphemeralStore::new()),
            Arc::new(SessionStore::new(Arc::new(MemoryBackend::new()))),
        )
    }

    /// Creates an orchestrator whose session store uses the configured backend.
    pub fn from_config(config: &Config) -> Result<Self>
    where
        T: Serialize + DeserializeOwned,
    {
        let backend = config.session_backend()?;
        Ok(Self::new(
            Arc::new(EphemeralStore::new()),
            Arc::new(SessionStore::new(backend)),
        ))
    }

    // == Store ==
    /// Returns the store backing `kind`.
    pub fn store(&self, kind: StorageKind) -> &Arc<dyn CacheStore<T>> {
        match kind {
            StorageKind::Ephemeral => &self.inner.ephemeral,
            StorageKind::Session => &self.inner.session,
        }
    }

    /// Returns the stored entry for a config's key, fresh or stale.
    pub fn cached(&self, config: &FetchConfig<T>) -> Option<CacheEntry<T>> {
        self.store(config.storage()).get(config.key())
    }

    // == Resolve ==
    /// Resolves `config` to a settled [`FetchState`].
    ///
    /// A fresh entry is returned without calling `producer`. Otherwise the
    /// producer (or an in-flight one for the same key, unless `force_refresh`)
    /// races the configured timeout. Failures and timeouts go through the
    /// [`FallbackResolver`]; this never returns an error.
    pub async fn resolve<F, Fut, E>(
        &self,
        config: &FetchConfig<T>,
        producer: F,
        force_refresh: bool,
    ) -> FetchState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        match self.begin(config, producer, force_refresh) {
            Resolution::Ready(state) => state,
            Resolution::Pending(pending) => self.settle(config, pending).await,
        }
    }

    /// Synchronous half of [`resolve`](Self::resolve): answers from a fresh
    /// entry, or starts (or joins) the flight before returning.
    ///
    /// The flight runs on its own task, so dropping the returned
    /// [`PendingFetch`] never stops the producer.
    pub(crate) fn begin<F, Fut, E>(
        &self,
        config: &FetchConfig<T>,
        producer: F,
        force_refresh: bool,
    ) -> Resolution<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let key = config.key();
        let existing = self.cached(config);

        if !force_refresh {
            if let Some(entry) = existing.as_ref().filter(|e| e.is_fresh()) {
                debug!(key, "fresh cache hit");
                self.stats().record_hit();
                return Resolution::Ready(FetchState::cached(entry.value.clone()));
            }
        }

        debug!(key, force_refresh, stale = existing.is_some(), "cache miss");
        self.stats().record_miss();

        let flight = self.join_or_start(config, producer, force_refresh);
        Resolution::Pending(PendingFetch { flight, existing })
    }

    /// Awaits a started flight against the configured timeout.
    pub(crate) async fn settle(&self, config: &FetchConfig<T>, pending: PendingFetch<T>) -> FetchState<T> {
        let PendingFetch { flight, existing } = pending;

        match tokio::time::timeout(config.timeout(), flight).await {
            Ok(Ok(value)) => FetchState::fetched(value),
            Ok(Err(err)) => self.fall_back(config, existing, err),
            Err(_) => self.fall_back(config, existing, FetchError::Timeout(config.timeout())),
        }
    }

    // == Invalidate ==
    /// Deletes the entry for `key` from the chosen store.
    pub fn invalidate(&self, kind: StorageKind, key: &str) {
        debug!(key, ?kind, "invalidating entry");
        self.store(kind).delete(key);
    }

    // == Purge Expired ==
    /// Purges long-stale entries from both stores.
    pub fn purge_expired(&self, retention: Duration) -> usize {
        self.inner.ephemeral.purge_expired(retention) + self.inner.session.purge_expired(retention)
    }

    // == Stats ==
    /// Returns a snapshot of the resolution counters.
    pub fn stats_snapshot(&self) -> CacheStats {
        self.stats().clone()
    }

    /// Number of registered (non-forced) flights still running.
    pub fn in_flight(&self) -> usize {
        self.registry().len()
    }

    fn stats(&self) -> MutexGuard<'_, CacheStats> {
        self.inner
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<FlightKey, InFlight<T>>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // == Flights ==
    fn join_or_start<F, Fut, E>(
        &self,
        config: &FetchConfig<T>,
        producer: F,
        force_refresh: bool,
    ) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let flight_key = (config.storage(), config.key().to_string());
        let mut registry = self.registry();

        if !force_refresh {
            if let Some(running) = registry.get(&flight_key) {
                debug!(key = config.key(), flight = running.id, "joining in-flight request");
                self.stats().record_coalesced();
                return running.flight.clone();
            }
        }

        let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
        let flight = self.spawn_flight(id, flight_key.clone(), config.ttl(), producer());

        if !force_refresh {
            registry.insert(
                flight_key,
                InFlight {
                    id,
                    flight: flight.clone(),
                },
            );
        }

        flight
    }

    fn spawn_flight<Fut, E>(&self, id: u64, flight_key: FlightKey, ttl: Duration, fut: Fut) -> Flight<T>
    where
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        debug!(key = %flight_key.1, flight = id, "starting producer");
        self.stats().record_producer_run();

        let kind = flight_key.0;
        let store = Arc::clone(self.store(kind));
        let guard = FlightGuard {
            registry: Arc::clone(&self.inner.in_flight),
            key: flight_key,
            id,
        };

        let handle = tokio::spawn(async move {
            let guard = guard;
            let key = guard.key.1.as_str();

            match fut.await {
                Ok(value) => {
                    commit(kind, store, key.to_string(), value.clone(), ttl).await;
                    debug!(key, flight = id, "producer succeeded, entry committed");
                    Ok(value)
                }
                Err(err) => {
                    let err: anyhow::Error = err.into();
                    debug!(key, flight = id, error = %err, "producer failed");
                    Err(FetchError::Producer(format!("{err:#}")))
                }
            }
        });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(FetchError::Aborted(join_err.to_string())),
            }
        }
        .boxed()
        .shared()
    }

    fn fall_back(
        &self,
        config: &FetchConfig<T>,
        existing: Option<CacheEntry<T>>,
        cause: FetchError,
    ) -> FetchState<T> {
        // Prefer whatever the store holds now; a coalesced flight may have failed
        // after another writer refreshed the key
        let stale = self.cached(config).or(existing);
        let decision = FallbackResolver::decide(stale, config.static_default().cloned(), cause);

        let mut stats = self.stats();
        match &decision {
            Fallback::Stale { warning, .. } => {
                warn!(key = config.key(), error = %warning, "serving stale entry");
                stats.record_stale();
            }
            Fallback::StaticDefault(_) => {
                warn!(key = config.key(), "serving static default");
                stats.record_default();
            }
            Fallback::Failed(err) => {
                warn!(key = config.key(), error = %err, "fetch failed with no fallback");
                stats.record_error();
            }
        }
        drop(stats);

        decision.into_state()
    }
}

/// Writes a flight's result. Session writes may touch the disk, so they run
/// on the blocking pool.
async fn commit<T>(kind: StorageKind, store: Arc<dyn CacheStore<T>>, key: String, value: T, ttl: Duration)
where
    T: Send + Sync + 'static,
{
    match kind {
        StorageKind::Ephemeral => store.set(&key, value, ttl),
        StorageKind::Session => {
            let written = tokio::task::spawn_blocking(move || store.set(&key, value, ttl)).await;
            if let Err(err) = written {
                warn!(error = %err, "session commit did not complete");
            }
        }
    }
}
