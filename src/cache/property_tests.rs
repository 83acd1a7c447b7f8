//! Property-Based Tests for the Cache and Orchestrator
//!
//! Uses proptest to check store round-trips, expiry, fallback ordering,
//! request coalescing and tolerance of broken backends.

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::cache::{
    CacheEntry, CacheStore, EphemeralStore, MemoryBackend, SessionStore, StorageKind,
};
use crate::error::{Result, StorageError};
use crate::fetch::{FetchConfig, FetchState, Orchestrator};

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:-]{1,64}".prop_map(|s| s)
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}".prop_map(|s| s)
}

fn storage_kind_strategy() -> impl Strategy<Value = StorageKind> {
    prop_oneof![Just(StorageKind::Ephemeral), Just(StorageKind::Session)]
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

/// A store whose backend throws on every call.
struct FailingStore;

impl CacheStore<String> for FailingStore {
    fn try_get(&self, _key: &str) -> Result<Option<CacheEntry<String>>> {
        Err(StorageError::Corrupted {
            key: "any".to_string(),
            reason: "unreadable".to_string(),
        })
    }

    fn try_put(&self, _key: &str, _entry: CacheEntry<String>) -> Result<()> {
        Err(StorageError::QuotaExceeded {
            needed: usize::MAX,
            limit: 0,
        })
    }

    fn try_delete(&self, _key: &str) -> Result<()> {
        Err(StorageError::Poisoned)
    }

    fn try_purge_expired(&self, _retention: Duration) -> Result<usize> {
        Err(StorageError::Poisoned)
    }
}

fn orchestrator() -> Orchestrator<String> {
    Orchestrator::in_memory()
}

fn fetch_config(key: &str, kind: StorageKind, ttl: Duration) -> FetchConfig<String> {
    FetchConfig::builder()
        .key(key)
        .ttl(ttl)
        .timeout(Duration::from_secs(1))
        .storage(kind)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // *For any* key and value, storing then reading within the TTL returns the
    // stored value unchanged, in both stores.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let ephemeral = EphemeralStore::new();
        let session: SessionStore<String> = SessionStore::new(Arc::new(MemoryBackend::new()));

        ephemeral.set(&key, value.clone(), TEST_TTL);
        session.set(&key, value.clone(), TEST_TTL);

        let from_ephemeral = ephemeral.get(&key).unwrap();
        let from_session = session.get(&key).unwrap();
        prop_assert!(from_ephemeral.is_fresh());
        prop_assert!(from_session.is_fresh());
        prop_assert_eq!(from_ephemeral.value, value.clone());
        prop_assert_eq!(from_session.value, value);
    }

    // *For any* key, after a delete a subsequent read finds nothing.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let store = EphemeralStore::new();

        store.set(&key, value, TEST_TTL);
        prop_assert!(store.get(&key).is_some(), "Key should exist before delete");

        store.delete(&key);
        prop_assert!(store.get(&key).is_none(), "Key should not exist after delete");
    }

    // *For any* key, writing V1 then V2 leaves V2; last writer wins.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let store = EphemeralStore::new();

        store.set(&key, value1, TEST_TTL);
        store.set(&key, value2.clone(), TEST_TTL);

        prop_assert_eq!(store.get(&key).unwrap().value, value2);
        prop_assert_eq!(store.len(), 1);
    }

    // *For any* sequence of operations, the store agrees with a plain map model.
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let store = EphemeralStore::new();
        let mut model = std::collections::HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(&key, value.clone(), TEST_TTL);
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let actual = store.get(&key).map(|entry| entry.value);
                    prop_assert_eq!(actual.as_ref(), model.get(&key));
                }
                CacheOp::Delete { key } => {
                    store.delete(&key);
                    model.remove(&key);
                }
            }
        }

        prop_assert_eq!(store.len(), model.len());
    }

    // *For any* entry whose age has reached its TTL, resolve does not
    // short-circuit and the producer runs.
    #[test]
    fn prop_expired_entry_invokes_producer(
        key in valid_key_strategy(),
        stale in valid_value_strategy(),
        fresh in valid_value_strategy(),
        age_secs in 1i64..3600,
        kind in storage_kind_strategy()
    ) {
        let orchestrator = orchestrator();
        let ttl = Duration::from_secs(age_secs as u64);
        let written = Utc::now() - chrono::Duration::seconds(age_secs);
        orchestrator.store(kind).put(&key, CacheEntry::written_at(stale, written, ttl));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = fetch_config(&key, kind, ttl);

        let state = tokio_test::block_on(orchestrator.resolve(
            &config,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let fresh = fresh.clone();
                async move { Ok::<_, anyhow::Error>(fresh) }
            },
            false,
        ));

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert!(!state.served_from_cache);
    }

    // *For any* failing producer with both a stale entry and a static default
    // present, the stale entry's value wins.
    #[test]
    fn prop_stale_beats_static_default(
        key in valid_key_strategy(),
        stale in valid_value_strategy(),
        default in valid_value_strategy(),
        kind in storage_kind_strategy()
    ) {
        let orchestrator = orchestrator();
        let written = Utc::now() - chrono::Duration::seconds(10);
        orchestrator
            .store(kind)
            .put(&key, CacheEntry::written_at(stale.clone(), written, Duration::from_secs(1)));

        let config: FetchConfig<String> = FetchConfig::builder()
            .key(key)
            .ttl(Duration::from_secs(1))
            .timeout(Duration::from_secs(1))
            .storage(kind)
            .static_default(default)
            .build()
            .unwrap();

        let state = tokio_test::block_on(orchestrator.resolve(
            &config,
            || async { Err::<String, _>(anyhow::anyhow!("network down")) },
            false,
        ));

        prop_assert_eq!(state.data, Some(stale));
        prop_assert!(state.served_from_cache);
        prop_assert_eq!(state.error, None);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // *For any* N concurrent non-forced resolves of one key, the producer runs
    // exactly once and every caller sees its value.
    #[test]
    fn prop_concurrent_resolves_coalesce(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        callers in 2usize..16
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        runtime.block_on(async {
            let orchestrator = orchestrator();
            let config = Arc::new(fetch_config(&key, StorageKind::Ephemeral, TEST_TTL));
            let calls = Arc::new(AtomicUsize::new(0));

            let mut handles = Vec::with_capacity(callers);
            for _ in 0..callers {
                let orchestrator = orchestrator.clone();
                let config = Arc::clone(&config);
                let calls = Arc::clone(&calls);
                let value = value.clone();

                handles.push(tokio::spawn(async move {
                    orchestrator
                        .resolve(
                            &config,
                            move || async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(50)).await;
                                Ok::<_, anyhow::Error>(value)
                            },
                            false,
                        )
                        .await
                }));
            }

            for handle in handles {
                let state = handle.await.expect("Task should not panic");
                prop_assert_eq!(state.data.as_ref(), Some(&value));
            }

            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            prop_assert_eq!(orchestrator.in_flight(), 0);
            Ok(())
        })?;
    }

    // *For any* request, a store that fails every read and write never makes
    // resolve fail; every call behaves as a miss.
    #[test]
    fn prop_failing_store_behaves_as_miss(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        repeats in 1usize..5
    ) {
        let orchestrator: Orchestrator<String> =
            Orchestrator::new(Arc::new(FailingStore), Arc::new(FailingStore));
        let config = fetch_config(&key, StorageKind::Ephemeral, TEST_TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..repeats {
            let calls = Arc::clone(&calls);
            let expected = value.clone();
            let produced = value.clone();
            let state = tokio_test::block_on(orchestrator.resolve(
                &config,
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(produced)
                },
                false,
            ));
            prop_assert_eq!(state, FetchState::fetched(expected));
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), repeats);
    }
}
