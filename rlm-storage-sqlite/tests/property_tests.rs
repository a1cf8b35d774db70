//! Property-based tests for `SqliteStore`'s persistence invariants: a
//! stored episode reads back byte-for-byte, and FTS search never returns
//! more rows than the caller's limit no matter what query text it's fed.

use proptest::prelude::*;
use rlm_core::store::{ListFilter, Store};
use rlm_core::types::Episode;
use rlm_storage_sqlite::SqliteStore;

fn temp_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("memory.db");
    let store = SqliteStore::new(db_path);
    (dir, store)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 30, ..ProptestConfig::default() })]

    /// Whatever episode goes in via `upsert_entry` comes back identical
    /// via `get_entry`, regardless of tags, summary, or content.
    #[test]
    fn stored_episode_round_trips_exactly(
        summary in "[a-zA-Z0-9 ]{0,60}",
        content in "[a-zA-Z0-9 \n]{0,400}",
        tags in proptest::collection::vec("[a-z]{1,10}", 0..6),
        source_name in proptest::option::of("[a-z0-9_./-]{1,30}"),
    ) {
        let (_dir, store) = temp_store();
        let episode = Episode::new(summary, tags, "manual", source_name, content);
        store.upsert_entry(&episode).expect("upsert should succeed");

        let fetched = store.get_entry(&episode.id).expect("get_entry should succeed");
        prop_assert_eq!(Some(episode), fetched);
    }

    /// `list_entries` never returns more rows than the requested limit,
    /// across any limit/offset combination within the inserted set.
    #[test]
    fn list_entries_respects_limit(
        count in 0usize..15usize,
        limit in 1usize..20usize,
    ) {
        let (_dir, store) = temp_store();
        for i in 0..count {
            let episode = Episode::new(
                format!("entry {i}"),
                vec!["test".to_string()],
                "manual",
                None,
                format!("content for entry {i}"),
            );
            store.upsert_entry(&episode).expect("upsert should succeed");
        }

        let filter = ListFilter { tags: Vec::new(), limit: Some(limit), offset: 0 };
        let results = store.list_entries(&filter).expect("list_entries should succeed");
        prop_assert!(results.len() <= limit);
        prop_assert!(results.len() <= count);
    }

    /// `delete_entry` leaves `count_entries` decremented by exactly one
    /// when the id existed, and unchanged when it didn't.
    #[test]
    fn delete_entry_decrements_count_only_when_present(
        summary in "[a-zA-Z0-9 ]{1,40}",
    ) {
        let (_dir, store) = temp_store();
        let episode = Episode::new(summary, vec![], "manual", None, "body".to_string());
        store.upsert_entry(&episode).expect("upsert should succeed");
        let before = store.count_entries().expect("count should succeed");

        let deleted = store.delete_entry(&episode.id).expect("delete should succeed");
        prop_assert!(deleted);
        prop_assert_eq!(store.count_entries().unwrap(), before - 1);

        let deleted_again = store.delete_entry(&episode.id).expect("delete should succeed");
        prop_assert!(!deleted_again);
        prop_assert_eq!(store.count_entries().unwrap(), before - 1);
    }

    /// `search_fts` never returns more rows than `limit`, no matter what
    /// (possibly FTS5-syntax-hostile) query text is thrown at it.
    #[test]
    fn search_fts_never_exceeds_limit(
        query in "[a-zA-Z0-9 \"*^():-]{0,20}",
        limit in 1usize..10usize,
    ) {
        let (_dir, store) = temp_store();
        for i in 0..12 {
            let episode = Episode::new(
                format!("note {i}"),
                vec![],
                "manual",
                None,
                format!("the quick brown fox jumps over the lazy dog number {i}"),
            );
            store.upsert_entry(&episode).expect("upsert should succeed");
        }

        let results = store.search_fts(&query, &[], limit).expect("search_fts should not error on any input");
        prop_assert!(results.len() <= limit);
    }
}
