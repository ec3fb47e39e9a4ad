//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key determinism, TTL correctness and the
//! overwrite/sweep/clear contracts of the store.

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use crate::cache::{CacheKey, CacheStore, KeyBuilder, ManualClock, SearchParams};

// == Test Configuration ==
const T0: i64 = 1_700_000_000;

fn memory_store() -> (CacheStore, ManualClock) {
    let clock = ManualClock::at(T0);
    let store = CacheStore::open_in_memory(clock.shared()).unwrap();
    (store, clock)
}

// == Strategies ==
fn word_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,24}"
}

fn search_strategy() -> impl Strategy<Value = SearchParams> {
    (
        "[A-Z]{2,8}",
        prop::option::of("http://purl\\.obolibrary\\.org/obo/[A-Z]{2,5}_[0-9]{1,6}"),
        "[a-z]{1,12}( [a-z]{1,12}){0,2}",
        1u32..20,
        prop::sample::select(vec![10u32, 25, 50, 100]),
    )
        .prop_map(|(ontology, branch, query, page, page_size)| SearchParams {
            ontology,
            branch,
            query,
            page,
            page_size,
        })
}

/// Flat parameter maps with scalar values.
fn params_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::hash_map(
        word_strategy(),
        prop_oneof![
            word_strategy().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
        ],
        0..8,
    )
    .prop_map(|map| map.into_iter().collect())
}

/// Inserts extra spaces around and between the words of a string.
fn reformat(text: &str) -> String {
    format!("  {}\t", text.split(' ').collect::<Vec<_>>().join("   "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Any permutation of the same parameters normalizes to the same key.
    #[test]
    fn prop_key_ignores_parameter_order(params in params_strategy(), seed in any::<u64>()) {
        let mut shuffled = params.clone();
        let n = shuffled.len();
        if n > 1 {
            shuffled.rotate_left((seed as usize) % n);
            shuffled.reverse();
        }

        let forward: Map<String, Value> = params.into_iter().collect();
        let backward: Map<String, Value> = shuffled.into_iter().collect();

        let k1 = CacheKey::from_json("op", &Value::Object(forward)).unwrap();
        let k2 = CacheKey::from_json("op", &Value::Object(backward)).unwrap();
        prop_assert_eq!(k1, k2);
    }

    // Whitespace differences in the query never change the key.
    #[test]
    fn prop_key_ignores_incidental_whitespace(search in search_strategy()) {
        let reformatted = SearchParams {
            query: reformat(&search.query),
            ontology: format!(" {} ", search.ontology),
            ..search.clone()
        };
        prop_assert_eq!(
            search.cache_key("term_search").unwrap(),
            reformatted.cache_key("term_search").unwrap()
        );
    }

    // Distinct searches in a generated corpus never share a key.
    #[test]
    fn prop_no_collisions(corpus in prop::collection::hash_set(search_strategy().prop_map(|s| {
        (s.ontology, s.branch, s.query, s.page, s.page_size)
    }), 1..200)) {
        let mut keys = HashSet::new();
        for (ontology, branch, query, page, page_size) in &corpus {
            let search = SearchParams {
                ontology: ontology.clone(),
                branch: branch.clone(),
                query: query.clone(),
                page: *page,
                page_size: *page_size,
            };
            keys.insert(search.cache_key("term_search").unwrap());
        }
        prop_assert_eq!(keys.len(), corpus.len());
    }

    // A record with TTL T hits strictly before T seconds and misses from T on.
    #[test]
    fn prop_ttl_correctness(ttl in 1u64..10_000, elapsed in 0i64..20_000) {
        let (store, clock) = memory_store();
        let key = KeyBuilder::new("ttl").int("n", ttl as i64).build().unwrap();
        store.put(&key, "payload", ttl).unwrap();

        clock.advance(elapsed);
        let hit = store.get(&key).unwrap().is_some();
        prop_assert_eq!(hit, elapsed < ttl as i64);
    }

    // Lazy eviction and the sweep agree on which records are expired.
    #[test]
    fn prop_sweep_agrees_with_lazy_eviction(
        ttls in prop::collection::vec(1u64..100, 1..20),
        elapsed in 0i64..120,
    ) {
        let (store, clock) = memory_store();
        for (i, ttl) in ttls.iter().enumerate() {
            let key = KeyBuilder::new("sweep").int("i", i as i64).build().unwrap();
            store.put(&key, "p", *ttl).unwrap();
        }
        clock.advance(elapsed);

        let expected = ttls.iter().filter(|ttl| elapsed >= **ttl as i64).count();
        let report = store.sweep_expired().unwrap();
        prop_assert_eq!(report.removed, expected);
        prop_assert_eq!(report.remaining, ttls.len() - expected);

        for i in 0..ttls.len() {
            let key = KeyBuilder::new("sweep").int("i", i as i64).build().unwrap();
            let alive = store.get(&key).unwrap().is_some();
            prop_assert_eq!(alive, elapsed < ttls[i] as i64);
        }

        prop_assert_eq!(store.sweep_expired().unwrap().removed, 0);
    }

    // The last write for a key wins and leaves exactly one record.
    #[test]
    fn prop_overwrite_semantics(
        writes in prop::collection::vec((word_strategy(), word_strategy()), 1..40)
    ) {
        let (store, clock) = memory_store();
        let mut expected: HashMap<String, (String, i64)> = HashMap::new();

        for (name, payload) in &writes {
            clock.advance(1);
            let key = KeyBuilder::new("overwrite").str("name", name).build().unwrap();
            store.put(&key, payload, 3600).unwrap();
            expected.insert(name.clone(), (payload.clone(), store.now()));
        }

        prop_assert_eq!(store.len().unwrap(), expected.len());
        for (name, (payload, created_at)) in &expected {
            let key = KeyBuilder::new("overwrite").str("name", name).build().unwrap();
            let record = store.get(&key).unwrap().unwrap();
            prop_assert_eq!(&record.payload, payload);
            prop_assert_eq!(record.created_at, *created_at);
        }
    }

    // Clear-all removes every record regardless of TTL.
    #[test]
    fn prop_clear_completeness(names in prop::collection::hash_set(word_strategy(), 0..30)) {
        let (store, _clock) = memory_store();
        for name in &names {
            let key = KeyBuilder::new("clear").str("name", name).build().unwrap();
            store.put(&key, "p", u64::MAX).unwrap();
        }

        prop_assert_eq!(store.clear_all().unwrap(), names.len());
        for name in &names {
            let key = KeyBuilder::new("clear").str("name", name).build().unwrap();
            prop_assert!(store.get(&key).unwrap().is_none());
        }
    }
}
