//! Schema DDL and FTS5 trigger definitions.
//!
//! The `entries`/`entries_fts` table pair and its three triggers are
//! grounded verbatim (structure, column weights, tokenizer) in
//! `rlm/db.py::_init_schema`. `rlm/db.py` never defines a facts table at
//! all (`rlm/facts.py` calls storage functions with no retrievable
//! definition anywhere in the original source), so `facts`/`facts_fts`
//! is authored fresh here, structurally analogous to the entries pair,
//! per spec.md §4.1's prose description of the facts store.

/// Full schema, applied once per fresh database file. Idempotent via
/// `IF NOT EXISTS` so opening an existing database is a no-op.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    summary TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    timestamp REAL NOT NULL,
    source TEXT NOT NULL,
    source_name TEXT,
    char_count INTEGER NOT NULL,
    content TEXT NOT NULL,
    chunks TEXT
);

CREATE INDEX IF NOT EXISTS idx_entries_source_name ON entries(source_name);
CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON entries(timestamp);

CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
    summary,
    tags,
    content,
    content='entries',
    content_rowid='rowid',
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS entries_ai AFTER INSERT ON entries BEGIN
    INSERT INTO entries_fts(rowid, summary, tags, content)
    VALUES (new.rowid, new.summary, new.tags, new.content);
END;

CREATE TRIGGER IF NOT EXISTS entries_ad AFTER DELETE ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, summary, tags, content)
    VALUES ('delete', old.rowid, old.summary, old.tags, old.content);
END;

CREATE TRIGGER IF NOT EXISTS entries_au AFTER UPDATE ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, summary, tags, content)
    VALUES ('delete', old.rowid, old.summary, old.tags, old.content);
    INSERT INTO entries_fts(rowid, summary, tags, content)
    VALUES (new.rowid, new.summary, new.tags, new.content);
END;

CREATE TABLE IF NOT EXISTS facts (
    id TEXT PRIMARY KEY,
    fact_text TEXT NOT NULL,
    source_entry_id TEXT NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    entity TEXT,
    fact_type TEXT NOT NULL,
    confidence REAL NOT NULL,
    created_at REAL NOT NULL,
    superseded_by TEXT
);

CREATE INDEX IF NOT EXISTS idx_facts_entity_type ON facts(entity, fact_type);
CREATE INDEX IF NOT EXISTS idx_facts_source_entry ON facts(source_entry_id);

CREATE VIRTUAL TABLE IF NOT EXISTS facts_fts USING fts5(
    fact_text,
    entity,
    fact_type,
    content='facts',
    content_rowid='rowid',
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS facts_ai AFTER INSERT ON facts BEGIN
    INSERT INTO facts_fts(rowid, fact_text, entity, fact_type)
    VALUES (new.rowid, new.fact_text, new.entity, new.fact_type);
END;

CREATE TRIGGER IF NOT EXISTS facts_ad AFTER DELETE ON facts BEGIN
    INSERT INTO facts_fts(facts_fts, rowid, fact_text, entity, fact_type)
    VALUES ('delete', old.rowid, old.fact_text, old.entity, old.fact_type);
END;

CREATE TRIGGER IF NOT EXISTS facts_au AFTER UPDATE ON facts BEGIN
    INSERT INTO facts_fts(facts_fts, rowid, fact_text, entity, fact_type)
    VALUES ('delete', old.rowid, old.fact_text, old.entity, old.fact_type);
    INSERT INTO facts_fts(rowid, fact_text, entity, fact_type)
    VALUES (new.rowid, new.fact_text, new.entity, new.fact_type);
END;
";

/// Drop and recreate both FTS indexes from their content tables, used by
/// the hidden `admin rebuild-fts` verb to repair drift after, e.g., a
/// database restored from an out-of-band backup.
pub const REBUILD_FTS_SQL: &str = r"
INSERT INTO entries_fts(entries_fts) VALUES ('rebuild');
INSERT INTO facts_fts(facts_fts) VALUES ('rebuild');
";
