//! End-to-end tests against the compiled `rlm` binary, exercising the
//! verb surface spec.md §6.1 defines. Every invocation points
//! `RLM_ORACLE_CMD` at a binary that doesn't exist so enrichment always
//! takes the documented fallback path (spec.md §4.3) instead of
//! depending on a real LM being reachable in CI.

use assert_cmd::Command;
use predicates::str::contains;

fn rlm_cmd(db_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("rlm").expect("rlm binary should be built for tests");
    cmd.env("RLM_DB_PATH", db_path)
        .env("RLM_ORACLE_CMD", "definitely-not-a-real-oracle-binary");
    cmd
}

#[test]
fn remember_then_recall_round_trips_through_the_binary() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");

    rlm_cmd(&db_path)
        .args(["remember", "We chose pytest over unittest."])
        .assert()
        .success()
        .stdout(contains("Stored m_"));

    rlm_cmd(&db_path)
        .args(["recall", "pytest"])
        .assert()
        .success()
        .stdout(contains("pytest"));
}

#[test]
fn memory_list_reports_no_entries_on_a_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");

    rlm_cmd(&db_path)
        .args(["memory-list"])
        .assert()
        .success()
        .stdout(contains("No entries found."));
}

#[test]
fn forget_on_unknown_id_reports_not_found_but_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");

    rlm_cmd(&db_path)
        .args(["forget", "m_doesnotexist"])
        .assert()
        .success()
        .stdout(contains("No entry found"));
}

#[test]
fn memory_extract_on_unknown_id_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");

    rlm_cmd(&db_path)
        .args(["memory-extract", "m_doesnotexist"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn stats_on_a_fresh_store_reports_zero_entries() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");

    rlm_cmd(&db_path)
        .args(["stats"])
        .assert()
        .success()
        .stdout(contains("Entries: 0"));
}

#[test]
fn export_session_on_a_schema_a_transcript_produces_a_transcript_header() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");
    let session_path = dir.path().join("session.jsonl");
    std::fs::write(&session_path, test_utils::schema_a_transcript(2)).unwrap();

    rlm_cmd(&db_path)
        .args(["export-session", session_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Session Transcript"));
}

#[test]
fn facts_list_on_a_fresh_store_reports_no_facts() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");

    rlm_cmd(&db_path)
        .args(["facts"])
        .assert()
        .success()
        .stdout(contains("No facts found."));
}

#[test]
fn admin_rebuild_fts_succeeds_on_a_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");

    rlm_cmd(&db_path)
        .args(["admin", "rebuild-fts"])
        .assert()
        .success()
        .stdout(contains("FTS indexes rebuilt."));
}

#[test]
fn remember_file_dedups_by_source_name_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memory.db");
    let content_path = dir.path().join("note.md");

    std::fs::write(&content_path, "v1").unwrap();
    rlm_cmd(&db_path)
        .args(["remember", "--file", content_path.to_str().unwrap()])
        .assert()
        .success();

    std::fs::write(&content_path, "v2").unwrap();
    rlm_cmd(&db_path)
        .args(["remember", "--file", content_path.to_str().unwrap()])
        .assert()
        .success();

    // Exactly one entry for this file should remain after dedup.
    rlm_cmd(&db_path)
        .args(["memory-list", "--limit", "50"])
        .assert()
        .success()
        .stdout(contains("## Entries (1)"));
}
