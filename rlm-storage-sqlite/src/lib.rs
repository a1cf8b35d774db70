#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

//! SQLite + FTS5 implementation of [`rlm_core::store::Store`].
//!
//! Mirrors the upstream `rlm/db.py` module: one `entries` table plus an
//! external-content `entries_fts` FTS5 index kept in sync by triggers,
//! with an analogous `facts`/`facts_fts` pair authored fresh since the
//! retrieved original source never defined a facts schema at all.

mod connection;
mod fts;
mod schema;
mod store;

pub use store::{db_path_of, SqliteStore};

#[cfg(test)]
mod scenario_tests {
    use rlm_core::store::{ListFilter, Store};
    use rlm_core::types::{Episode, Fact, FactType};

    use super::SqliteStore;

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("memory.db"));
        (dir, store)
    }

    #[test]
    fn upsert_then_get_round_trips_an_episode() {
        let (_dir, store) = temp_store();
        let episode = Episode::new(
            "a quick summary".to_string(),
            vec!["rust".to_string()],
            "text",
            Some("doc-1".to_string()),
            "the full content of the memory entry".to_string(),
        );
        store.upsert_entry(&episode).unwrap();

        let fetched = store.get_entry(&episode.id).unwrap().unwrap();
        assert_eq!(fetched.summary, episode.summary);
        assert_eq!(fetched.content, episode.content);
        assert_eq!(fetched.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn search_fts_finds_matching_entries_by_content() {
        let (_dir, store) = temp_store();
        let episode = Episode::new(
            "sqlite notes".to_string(),
            vec![],
            "text",
            None,
            "we chose sqlite with fts5 for full text search".to_string(),
        );
        store.upsert_entry(&episode).unwrap();

        let hits = store.search_fts("sqlite", &[], 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.id, episode.id);
    }

    #[test]
    fn delete_entry_cascades_to_its_facts() {
        let (_dir, store) = temp_store();
        let episode = Episode::new("s".to_string(), vec![], "text", None, "c".to_string());
        store.upsert_entry(&episode).unwrap();
        let fact = Fact {
            id: "f_000000000001".to_string(),
            fact_text: "the team decided to use sqlite for local storage".to_string(),
            source_entry_id: episode.id.clone(),
            entity: Some("team".to_string()),
            fact_type: FactType::Decision,
            confidence: 0.9,
            created_at: 0.0,
            superseded_by: None,
        };
        store.insert_fact(&fact).unwrap();

        store.delete_entry(&episode.id).unwrap();

        let remaining = store.find_facts_by_entity("team", "decision").unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn supersede_fact_marks_prior_fact_and_find_by_entity_excludes_it() {
        let (_dir, store) = temp_store();
        let episode = Episode::new("s".to_string(), vec![], "text", None, "c".to_string());
        store.upsert_entry(&episode).unwrap();

        let old_fact = Fact {
            id: "f_000000000001".to_string(),
            fact_text: "the user prefers vim for editing all files".to_string(),
            source_entry_id: episode.id.clone(),
            entity: Some("user".to_string()),
            fact_type: FactType::Preference,
            confidence: 0.9,
            created_at: 0.0,
            superseded_by: None,
        };
        store.insert_fact(&old_fact).unwrap();

        let new_fact_id = "f_000000000002".to_string();
        store.supersede_fact(&old_fact.id, &new_fact_id).unwrap();

        let remaining = store.find_facts_by_entity("user", "preference").unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn list_entries_filters_by_tag() {
        let (_dir, store) = temp_store();
        let tagged = Episode::new("tagged".to_string(), vec!["rust".to_string()], "text", None, "c1".to_string());
        let untagged = Episode::new("untagged".to_string(), vec!["python".to_string()], "text", None, "c2".to_string());
        store.upsert_entry(&tagged).unwrap();
        store.upsert_entry(&untagged).unwrap();

        let filtered = store
            .list_entries(&ListFilter {
                tags: vec!["rust".to_string()],
                limit: None,
                offset: 0,
            })
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, tagged.id);
    }

    #[test]
    fn delete_entries_by_source_name_removes_all_sharing_it() {
        let (_dir, store) = temp_store();
        let e1 = Episode::new("a".to_string(), vec![], "text", Some("doc".to_string()), "c1".to_string());
        let e2 = Episode::new("b".to_string(), vec![], "text", Some("doc".to_string()), "c2".to_string());
        store.upsert_entry(&e1).unwrap();
        store.upsert_entry(&e2).unwrap();

        let removed = store.delete_entries_by_source_name("doc").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count_entries().unwrap(), 0);
    }

    #[test]
    fn rebuild_fts_does_not_error_on_a_populated_store() {
        let (_dir, store) = temp_store();
        let episode = Episode::new("s".to_string(), vec![], "text", None, "content here".to_string());
        store.upsert_entry(&episode).unwrap();
        store.rebuild_fts().unwrap();
        let hits = store.search_fts("content", &[], 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn list_entries_intersects_multiple_tags() {
        let (_dir, store) = temp_store();
        let both = Episode::new(
            "both tags".to_string(),
            vec!["rust".to_string(), "async".to_string()],
            "text",
            None,
            "c1".to_string(),
        );
        let one = Episode::new("one tag".to_string(), vec!["rust".to_string()], "text", None, "c2".to_string());
        store.upsert_entry(&both).unwrap();
        store.upsert_entry(&one).unwrap();

        let filtered = store
            .list_entries(&ListFilter {
                tags: vec!["rust".to_string(), "async".to_string()],
                limit: None,
                offset: 0,
            })
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, both.id);
    }
}
