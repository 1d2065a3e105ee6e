//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the store's structural invariants under
//! arbitrary operation sequences: statistics accuracy, round-trip
//! storage, LRU ordering, and memory accounting.

use proptest::prelude::*;
use std::collections::HashSet;

use serde_json::json;

use crate::cache::store::{CacheStore, GetOptions, SetOptions, StoreOptions};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL: u64 = 300;

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_map(|s| s)
}

/// Generates valid cache values (strings of bounded size)
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}".prop_map(|s| s)
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

fn test_store() -> CacheStore {
    CacheStore::new(StoreOptions {
        max_entries: TEST_MAX_ENTRIES,
        default_ttl: TEST_DEFAULT_TTL,
        ..StoreOptions::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Statistics accuracy: for any sequence of operations, hit and miss
    // counters reflect exactly what each get observed, and the entry
    // count tracks the map.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = test_store();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let _ = store.set(&key, json!(value), None, SetOptions::default());
                }
                CacheOp::Get { key } => {
                    match store.get(&key, GetOptions::default()) {
                        Ok(Some(_)) => expected_hits += 1,
                        _ => expected_misses += 1,
                    }
                }
                CacheOp::Delete { key } => {
                    let _ = store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // Round-trip storage consistency: storing a pair and retrieving it
    // before expiration returns the exact value stored.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = test_store();

        store.set(&key, json!(value.clone()), None, SetOptions::default()).unwrap();

        let retrieved = store.get(&key, GetOptions::default()).unwrap();
        prop_assert_eq!(retrieved, Some(json!(value)), "Round-trip value mismatch");
    }

    // Delete removes the entry: after delete, get reports a miss.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = test_store();

        store.set(&key, json!(value), None, SetOptions::default()).unwrap();
        prop_assert!(store.get(&key, GetOptions::default()).unwrap().is_some());

        prop_assert!(store.delete(&key).unwrap());

        prop_assert!(store.get(&key, GetOptions::default()).unwrap().is_none());
    }

    // Overwrite semantics: the second value wins.
    #[test]
    fn prop_overwrite_returns_latest(
        key in valid_key_strategy(),
        v1 in valid_value_strategy(),
        v2 in valid_value_strategy(),
    ) {
        let mut store = test_store();

        store.set(&key, json!(v1), None, SetOptions::default()).unwrap();
        store.set(&key, json!(v2.clone()), None, SetOptions::default()).unwrap();

        prop_assert_eq!(
            store.get(&key, GetOptions::default()).unwrap(),
            Some(json!(v2))
        );
        prop_assert_eq!(store.len(), 1);
    }

    // LRU eviction order: with capacity C and more than C distinct keys
    // inserted in order with no intervening reads, the survivors are the
    // last C inserted.
    #[test]
    fn prop_lru_eviction_order(extra in 1usize..10) {
        let capacity = 5usize;
        let mut store = CacheStore::new(StoreOptions {
            max_entries: capacity,
            default_ttl: TEST_DEFAULT_TTL,
            ..StoreOptions::default()
        });

        let total = capacity + extra;
        for i in 0..total {
            store.set(&format!("key{i:03}"), json!(i), None, SetOptions::default()).unwrap();
        }

        prop_assert_eq!(store.len(), capacity);
        for i in 0..total {
            let survives = store.contains_key(&format!("key{i:03}"));
            prop_assert_eq!(survives, i >= total - capacity, "key{} survival", i);
        }
    }

    // LRU permutation: the recency list always contains exactly the live
    // keys, each once.
    #[test]
    fn prop_lru_is_permutation_of_map(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = test_store();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let _ = store.set(&key, json!(value), None, SetOptions::default());
                }
                CacheOp::Get { key } => {
                    let _ = store.get(&key, GetOptions::default());
                }
                CacheOp::Delete { key } => {
                    let _ = store.delete(&key);
                }
            }

            let recency = store.keys_by_recency();
            let distinct: HashSet<&String> = recency.iter().collect();
            prop_assert_eq!(recency.len(), store.len(), "LRU length mismatch");
            prop_assert_eq!(distinct.len(), recency.len(), "LRU contains duplicates");
            for key in &recency {
                prop_assert!(store.contains_key(key), "LRU tracks a dead key");
            }
        }
    }

    // Memory accounting: usage equals the recalibrated sum after any
    // operation sequence, and never exceeds the configured maximum.
    #[test]
    fn prop_memory_accounting_is_exact(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let max_memory: u64 = 64 * 1024;
        let mut store = CacheStore::new(StoreOptions {
            max_entries: TEST_MAX_ENTRIES,
            max_memory,
            default_ttl: TEST_DEFAULT_TTL,
            ..StoreOptions::default()
        });

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let _ = store.set(&key, json!(value), None, SetOptions::default());
                }
                CacheOp::Get { key } => {
                    let _ = store.get(&key, GetOptions::default());
                }
                CacheOp::Delete { key } => {
                    let _ = store.delete(&key);
                }
            }

            let tracked = store.stats().memory_usage;
            prop_assert!(tracked <= max_memory, "usage over limit: {}", tracked);

            let drift = store.recalibrate();
            prop_assert_eq!(drift, 0, "incremental accounting drifted");
        }
    }
}
