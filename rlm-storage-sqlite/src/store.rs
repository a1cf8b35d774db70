//! [`SqliteStore`]: the `Store` implementation backing this system's
//! single supported backend.
//!
//! CRUD and listing operations are grounded in `rlm/db.py`'s
//! `insert_entry`/`get_entry`/`delete_entry`/`count_entries`/
//! `list_all_entries`/`list_all_tags`. `search_fts` mirrors
//! `rlm/db.py::search_fts`'s two-tier fallback: try the permissive match
//! expression, and if FTS5 rejects it as a syntax error, retry with the
//! stricter alphabetic-only expression before giving up and returning no
//! results. The facts-table operations have no upstream Python
//! counterpart (see `schema.rs`'s module doc) and are authored
//! structurally analogous to the entries-table operations.

use std::path::{Path, PathBuf};

use rlm_core::error::{Error, Result};
use rlm_core::store::{ListFilter, ScoredFact, Store};
use rlm_core::types::{Chunk, Episode, EpisodeMeta, Fact, FactType, ScoredEpisode, SizeCategory, StoreStats};
use rusqlite::{params, Connection, OptionalExtension};

use crate::connection::with_connection;
use crate::fts::{build_match_expr, build_simple_match};
use crate::schema::REBUILD_FTS_SQL;

/// A `Store` backed by a single SQLite database file, accessed through
/// one thread-local connection per thread.
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if necessary) a store at `db_path`. Opening is
    /// cheap: the actual connection is established lazily, per thread,
    /// on first use.
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        with_connection(&self.db_path, f)
    }
}

fn row_to_meta(row: &rusqlite::Row) -> rusqlite::Result<EpisodeMeta> {
    let tags_json: String = row.get("tags")?;
    Ok(EpisodeMeta {
        id: row.get("id")?,
        summary: row.get("summary")?,
        tags: parse_tags(&tags_json),
        timestamp: row.get("timestamp")?,
        source: row.get("source")?,
        source_name: row.get("source_name")?,
        char_count: row.get::<_, i64>("char_count")? as usize,
    })
}

fn row_to_episode(row: &rusqlite::Row) -> rusqlite::Result<Episode> {
    let tags_json: String = row.get("tags")?;
    let chunks_json: Option<String> = row.get("chunks")?;
    Ok(Episode {
        id: row.get("id")?,
        summary: row.get("summary")?,
        tags: parse_tags(&tags_json),
        timestamp: row.get("timestamp")?,
        source: row.get("source")?,
        source_name: row.get("source_name")?,
        char_count: row.get::<_, i64>("char_count")? as usize,
        content: row.get("content")?,
        chunks: chunks_json.and_then(|s| serde_json::from_str::<Vec<Chunk>>(&s).ok()),
    })
}

fn row_to_fact(row: &rusqlite::Row) -> rusqlite::Result<Fact> {
    let fact_type_str: String = row.get("fact_type")?;
    Ok(Fact {
        id: row.get("id")?,
        fact_text: row.get("fact_text")?,
        source_entry_id: row.get("source_entry_id")?,
        entity: row.get("entity")?,
        fact_type: FactType::coerce(&fact_type_str),
        confidence: row.get("confidence")?,
        created_at: row.get("created_at")?,
        superseded_by: row.get("superseded_by")?,
    })
}

fn parse_tags(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

fn is_fts_syntax_error(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("fts5") || msg.contains("syntax error"))
}

/// A `(SELECT ...)` subquery selecting ids of entries carrying every tag
/// in `tags` (case-insensitive exact match via `json_each`), or `None` if
/// `tags` is empty (no restriction). `tags` must already be lowercased.
fn tag_intersection_subquery(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    let placeholders = vec!["?"; tags.len()].join(",");
    Some(format!(
        "(SELECT entries.id FROM entries, json_each(entries.tags)
          WHERE json_each.value IN ({placeholders})
          GROUP BY entries.id
          HAVING COUNT(DISTINCT json_each.value) = {})",
        tags.len()
    ))
}

impl Store for SqliteStore {
    fn upsert_entry(&self, episode: &Episode) -> Result<()> {
        self.with_conn(|conn| {
            let tags_json = serde_json::to_string(&episode.tags)?;
            let chunks_json = episode
                .chunks
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            conn.execute(
                "INSERT OR REPLACE INTO entries
                 (id, summary, tags, timestamp, source, source_name, char_count, content, chunks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    episode.id,
                    episode.summary,
                    tags_json,
                    episode.timestamp,
                    episode.source,
                    episode.source_name,
                    episode.char_count as i64,
                    episode.content,
                    chunks_json,
                ],
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
            Ok(())
        })
    }

    fn get_entry(&self, id: &str) -> Result<Option<Episode>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, summary, tags, timestamp, source, source_name, char_count, content, chunks
                 FROM entries WHERE id = ?1",
                params![id],
                row_to_episode,
            )
            .optional()
            .map_err(|e| Error::Storage(e.to_string()))
        })
    }

    fn list_entries(&self, filter: &ListFilter) -> Result<Vec<EpisodeMeta>> {
        self.with_conn(|conn| {
            let limit = filter.limit.unwrap_or(50) as i64;
            let offset = filter.offset as i64;
            let lowered: Vec<String> = filter.tags.iter().map(|t| t.to_lowercase()).collect();
            let rows = if let Some(subquery) = tag_intersection_subquery(&lowered) {
                let sql = format!(
                    "SELECT id, summary, tags, timestamp, source, source_name, char_count
                     FROM entries WHERE id IN {subquery}
                     ORDER BY timestamp DESC LIMIT ? OFFSET ?"
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| Error::Storage(e.to_string()))?;
                let mut qparams: Vec<&dyn rusqlite::ToSql> =
                    lowered.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
                qparams.push(&limit);
                qparams.push(&offset);
                stmt.query_map(rusqlite::params_from_iter(qparams), row_to_meta)
                    .map_err(|e| Error::Storage(e.to_string()))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| Error::Storage(e.to_string()))?
            } else {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, summary, tags, timestamp, source, source_name, char_count
                         FROM entries ORDER BY timestamp DESC LIMIT ?1 OFFSET ?2",
                    )
                    .map_err(|e| Error::Storage(e.to_string()))?;
                stmt.query_map(params![limit, offset], row_to_meta)
                    .map_err(|e| Error::Storage(e.to_string()))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| Error::Storage(e.to_string()))?
            };
            Ok(rows)
        })
    }

    fn find_entries_by_source_name(&self, source_name: &str) -> Result<Vec<EpisodeMeta>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, summary, tags, timestamp, source, source_name, char_count
                     FROM entries WHERE source_name = ?1 ORDER BY timestamp DESC",
                )
                .map_err(|e| Error::Storage(e.to_string()))?;
            stmt.query_map(params![source_name], row_to_meta)
                .map_err(|e| Error::Storage(e.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::Storage(e.to_string()))
        })
    }

    fn delete_entry(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn
                .execute("DELETE FROM entries WHERE id = ?1", params![id])
                .map_err(|e| Error::Storage(e.to_string()))?;
            Ok(changed > 0)
        })
    }

    fn delete_entries_by_source_name(&self, source_name: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "DELETE FROM entries WHERE source_name = ?1",
                    params![source_name],
                )
                .map_err(|e| Error::Storage(e.to_string()))?;
            Ok(changed)
        })
    }

    fn search_fts(&self, query: &str, tags: &[String], limit: usize) -> Result<Vec<ScoredEpisode>> {
        self.with_conn(|conn| {
            let expr = build_match_expr(query);
            if expr.is_empty() {
                return Ok(Vec::new());
            }
            let lowered: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
            let tag_clause = tag_intersection_subquery(&lowered)
                .map(|subquery| format!(" AND e.id IN {subquery}"))
                .unwrap_or_default();
            let sql = format!(
                "SELECT e.id, e.summary, e.tags, e.timestamp, e.source, e.source_name, e.char_count,
                        bm25(entries_fts, 3.0, 2.0, 1.0) AS rank
                 FROM entries_fts JOIN entries e ON e.rowid = entries_fts.rowid
                 WHERE entries_fts MATCH ?{tag_clause} ORDER BY rank LIMIT ?"
            );
            let limit_i64 = limit as i64;
            let run = |expr: &str| -> rusqlite::Result<Vec<ScoredEpisode>> {
                let mut stmt = conn.prepare(&sql)?;
                let mut qparams: Vec<&dyn rusqlite::ToSql> = vec![&expr];
                for t in &lowered {
                    qparams.push(t);
                }
                qparams.push(&limit_i64);
                stmt.query_map(rusqlite::params_from_iter(qparams), |row| {
                    let meta = row_to_meta(row)?;
                    let rank: f64 = row.get("rank")?;
                    Ok(ScoredEpisode {
                        meta,
                        score: (-rank * 100.0).round() / 100.0,
                    })
                })?
                .collect()
            };
            match run(&expr) {
                Ok(results) => Ok(results),
                Err(e) if is_fts_syntax_error(&e) => {
                    let simple = build_simple_match(query);
                    if simple.is_empty() {
                        Ok(Vec::new())
                    } else {
                        run(&simple).map_err(|e| Error::Storage(e.to_string()))
                    }
                }
                Err(e) => Err(Error::Storage(e.to_string())),
            }
        })
    }

    fn get_snippet(&self, id: &str, query: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let expr = build_match_expr(query);
            if expr.is_empty() {
                return Ok(None);
            }
            conn.query_row(
                "SELECT snippet(entries_fts, 2, '>>>', '<<<', '...', 10)
                 FROM entries_fts JOIN entries e ON e.rowid = entries_fts.rowid
                 WHERE e.id = ?1 AND entries_fts MATCH ?2",
                params![id, expr],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Storage(e.to_string()))
        })
    }

    fn list_all_tags(&self) -> Result<Vec<(String, usize)>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT json_each.value AS tag, COUNT(*) AS n
                     FROM entries, json_each(entries.tags)
                     GROUP BY tag ORDER BY n DESC, tag ASC",
                )
                .map_err(|e| Error::Storage(e.to_string()))?;
            stmt.query_map([], |row| {
                Ok((row.get::<_, String>("tag")?, row.get::<_, i64>("n")? as usize))
            })
            .map_err(|e| Error::Storage(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Storage(e.to_string()))
        })
    }

    fn count_entries(&self) -> Result<usize> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(|e| Error::Storage(e.to_string()))
        })
    }

    fn insert_fact(&self, fact: &Fact) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO facts
                 (id, fact_text, source_entry_id, entity, fact_type, confidence, created_at, superseded_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    fact.id,
                    fact.fact_text,
                    fact.source_entry_id,
                    fact.entity,
                    fact.fact_type.as_str(),
                    fact.confidence,
                    fact.created_at,
                    fact.superseded_by,
                ],
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
            Ok(())
        })
    }

    fn supersede_fact(&self, fact_id: &str, superseded_by: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE facts SET superseded_by = ?1 WHERE id = ?2",
                params![superseded_by, fact_id],
            )
            .map_err(|e| Error::Storage(e.to_string()))?;
            Ok(())
        })
    }

    fn list_facts(
        &self,
        entity: Option<&str>,
        fact_type: Option<&str>,
        include_superseded: bool,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Fact>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, fact_text, source_entry_id, entity, fact_type, confidence, created_at, superseded_by
                     FROM facts
                     WHERE (?1 OR superseded_by IS NULL)
                       AND (?2 IS NULL OR entity = ?2)
                       AND (?3 IS NULL OR fact_type = ?3)
                     ORDER BY created_at DESC LIMIT ?4 OFFSET ?5",
                )
                .map_err(|e| Error::Storage(e.to_string()))?;
            stmt.query_map(params![include_superseded, entity, fact_type, limit as i64, offset as i64], row_to_fact)
                .map_err(|e| Error::Storage(e.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::Storage(e.to_string()))
        })
    }

    fn search_facts_fts(
        &self,
        query: &str,
        fact_type: Option<&str>,
        include_superseded: bool,
        limit: usize,
    ) -> Result<Vec<ScoredFact>> {
        self.with_conn(|conn| {
            let expr = build_match_expr(query);
            if expr.is_empty() {
                return Ok(Vec::new());
            }
            let sql = "SELECT f.id, f.fact_text, f.source_entry_id, f.entity, f.fact_type, f.confidence,
                              f.created_at, f.superseded_by, bm25(facts_fts, 3.0, 2.0, 2.0) AS rank
                       FROM facts_fts JOIN facts f ON f.rowid = facts_fts.rowid
                       WHERE facts_fts MATCH ?1
                         AND (?2 OR f.superseded_by IS NULL)
                         AND (?3 IS NULL OR f.fact_type = ?3)
                       ORDER BY rank LIMIT ?4";
            let run = |expr: &str| -> rusqlite::Result<Vec<ScoredFact>> {
                let mut stmt = conn.prepare(sql)?;
                stmt.query_map(params![expr, include_superseded, fact_type, limit as i64], |row| {
                    let fact = row_to_fact(row)?;
                    let rank: f64 = row.get("rank")?;
                    Ok(ScoredFact {
                        fact,
                        score: (-rank * 100.0).round() / 100.0,
                    })
                })?
                .collect()
            };
            match run(&expr) {
                Ok(results) => Ok(results),
                Err(e) if is_fts_syntax_error(&e) => {
                    let simple = build_simple_match(query);
                    if simple.is_empty() {
                        Ok(Vec::new())
                    } else {
                        run(&simple).map_err(|e| Error::Storage(e.to_string()))
                    }
                }
                Err(e) => Err(Error::Storage(e.to_string())),
            }
        })
    }

    fn find_facts_by_entity(&self, entity: &str, fact_type: &str) -> Result<Vec<Fact>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, fact_text, source_entry_id, entity, fact_type, confidence, created_at, superseded_by
                     FROM facts
                     WHERE entity = ?1 AND fact_type = ?2 AND superseded_by IS NULL",
                )
                .map_err(|e| Error::Storage(e.to_string()))?;
            stmt.query_map(params![entity, fact_type], row_to_fact)
                .map_err(|e| Error::Storage(e.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::Storage(e.to_string()))
        })
    }

    fn get_stats(&self) -> Result<StoreStats> {
        self.with_conn(|conn| {
            let total_entries = conn
                .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get::<_, i64>(0))
                .map_err(|e| Error::Storage(e.to_string()))? as usize;
            let total_chars = conn
                .query_row("SELECT COALESCE(SUM(char_count), 0) FROM entries", [], |row| {
                    row.get::<_, i64>(0)
                })
                .map_err(|e| Error::Storage(e.to_string()))? as usize;

            let mut size_small = 0;
            let mut size_medium = 0;
            let mut size_large = 0;
            let mut size_huge = 0;
            {
                let mut stmt = conn
                    .prepare("SELECT char_count FROM entries")
                    .map_err(|e| Error::Storage(e.to_string()))?;
                let counts = stmt
                    .query_map([], |row| row.get::<_, i64>(0))
                    .map_err(|e| Error::Storage(e.to_string()))?;
                for count in counts {
                    let count = count.map_err(|e| Error::Storage(e.to_string()))? as usize;
                    match SizeCategory::of(count) {
                        SizeCategory::Small => size_small += 1,
                        SizeCategory::Medium => size_medium += 1,
                        SizeCategory::Large => size_large += 1,
                        SizeCategory::Huge => size_huge += 1,
                    }
                }
            }

            let by_source = {
                let mut stmt = conn
                    .prepare("SELECT source, COUNT(*) FROM entries GROUP BY source ORDER BY COUNT(*) DESC")
                    .map_err(|e| Error::Storage(e.to_string()))?;
                stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))
                    .map_err(|e| Error::Storage(e.to_string()))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| Error::Storage(e.to_string()))?
            };

            let oldest_timestamp = conn
                .query_row("SELECT MIN(timestamp) FROM entries", [], |row| row.get::<_, Option<f64>>(0))
                .map_err(|e| Error::Storage(e.to_string()))?;
            let newest_timestamp = conn
                .query_row("SELECT MAX(timestamp) FROM entries", [], |row| row.get::<_, Option<f64>>(0))
                .map_err(|e| Error::Storage(e.to_string()))?;

            Ok(StoreStats {
                total_entries,
                total_chars,
                size_small,
                size_medium,
                size_large,
                size_huge,
                by_source,
                oldest_timestamp,
                newest_timestamp,
                top_tags: Vec::new(),
                db_file_size_bytes: 0,
            })
        })
        .and_then(|mut stats| {
            stats.top_tags = self.list_all_tags()?.into_iter().take(10).collect();
            stats.db_file_size_bytes = std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0);
            Ok(stats)
        })
    }

    fn rebuild_fts(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(REBUILD_FTS_SQL)
                .map_err(|e| Error::Storage(e.to_string()))?;
            Ok(())
        })
    }
}

/// Exposed for callers that need the underlying path (e.g. the CLI's
/// `--db-path` flag echoing back what it resolved to).
#[must_use]
pub fn db_path_of(store: &SqliteStore) -> &Path {
    &store.db_path
}
