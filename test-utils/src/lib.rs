//! Fixture helpers shared by `rlm-core`, `rlm-storage-sqlite`, `rlm-cli`,
//! and `rlm-mcp` integration tests: episodes, facts, and transcript
//! snippets typical enough to exercise the engine's two-tier write split,
//! supersession, and FTS ranking without every test hand-rolling them.

use rlm_core::types::{Episode, Fact, FactType, RawFact};
use rlm_storage_sqlite::SqliteStore;

/// A short episode well under [`rlm_core::constants::SUMMARY_THRESHOLD`],
/// taking the single-entry write path.
#[must_use]
pub fn small_episode(summary: &str, content: &str) -> Episode {
    Episode::new(
        summary.to_string(),
        vec!["test".to_string()],
        "test",
        None,
        content.to_string(),
    )
}

/// An episode with `content` repeated until it exceeds `chars`, for
/// exercising the two-tier write split or the chunk manifest.
#[must_use]
pub fn large_episode(summary: &str, chars: usize) -> Episode {
    let paragraph = "The quick brown fox jumps over the lazy dog. ".repeat(20);
    let mut content = String::new();
    while content.chars().count() < chars {
        content.push_str(&paragraph);
        content.push_str("\n\n");
    }
    Episode::new(summary.to_string(), vec!["test".to_string()], "test", None, content)
}

/// A raw fact as an oracle would emit it, before normalization.
#[must_use]
pub fn raw_fact(text: &str, entity: Option<&str>, fact_type: &str, confidence: f64) -> RawFact {
    RawFact {
        fact_text: text.to_string(),
        entity: entity.map(str::to_string),
        fact_type: fact_type.to_string(),
        confidence,
    }
}

/// A fully-formed, already-normalized fact ready for direct
/// `Store::insert_fact` calls, bypassing the Fact Processor.
#[must_use]
pub fn stored_fact(text: &str, entity: Option<&str>, fact_type: FactType, source_entry_id: &str) -> Fact {
    Fact {
        id: rlm_core::types::new_fact_id(),
        fact_text: text.to_string(),
        source_entry_id: source_entry_id.to_string(),
        entity: entity.map(str::to_string),
        fact_type,
        confidence: 0.9,
        created_at: rlm_core::types::unix_timestamp(),
        superseded_by: None,
    }
}

/// A `SqliteStore` backed by a fresh temp-directory database, returned
/// alongside the [`tempfile::TempDir`] guard (drop order matters: the
/// store must not outlive its backing directory).
#[must_use]
pub fn temp_store() -> (SqliteStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir for test store");
    let store = SqliteStore::new(dir.path().join("memory.db"));
    (store, dir)
}

/// A minimal Schema-A (Claude-Code-style) transcript JSONL with `turns`
/// user/assistant records, suitable for normalizer and archival tests.
#[must_use]
pub fn schema_a_transcript(turns: usize) -> String {
    let mut lines = Vec::new();
    for i in 0..turns {
        lines.push(
            serde_json::json!({
                "type": "user",
                "message": {"role": "user", "content": format!("question {i}")}
            })
            .to_string(),
        );
        lines.push(
            serde_json::json!({
                "type": "assistant",
                "message": {"role": "assistant", "content": format!("answer {i}")}
            })
            .to_string(),
        );
    }
    lines.join("\n")
}
