//! The [`Store`] trait: the storage-agnostic seam between `rlm-core` and a
//! concrete backend (`rlm-storage-sqlite`).
//!
//! Unlike the teacher's `StorageBackend`, which is `#[async_trait]` to
//! accommodate both an async remote backend and a sync embedded one, this
//! trait is plain synchronous: the only backend this system targets
//! (SQLite via `rusqlite`) is itself synchronous, and threading every
//! call through an async runtime just to immediately block on it buys
//! nothing. Callers that need this off the async executor's thread
//! (the MCP server) are expected to wrap calls in `tokio::task::spawn_blocking`.

use crate::error::Result;
use crate::types::{Episode, EpisodeMeta, Fact, RawFact, ScoredEpisode, StoreStats};

/// A single full-text search hit against the facts table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFact {
    pub fact: Fact,
    pub score: f64,
}

/// Non-exhaustive filter for [`Store::list_entries`]. Mirrors
/// `rlm/db.py::list_all_entries`'s optional tag filter.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Tags that must ALL be present on a matching entry (intersection).
    pub tags: Vec<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Storage-agnostic persistence contract for episodes and facts.
///
/// Implementations own connection management, schema migration, and FTS
/// index maintenance; callers never see SQL.
pub trait Store: Send + Sync {
    /// Insert or replace an episode by id (`INSERT OR REPLACE`).
    fn upsert_entry(&self, episode: &Episode) -> Result<()>;

    /// Fetch a full episode by id.
    fn get_entry(&self, id: &str) -> Result<Option<Episode>>;

    /// List episode metadata, optionally filtered by tags (intersection:
    /// an entry must carry every tag given), newest-first.
    fn list_entries(&self, filter: &ListFilter) -> Result<Vec<EpisodeMeta>>;

    /// All episodes sharing a `source_name`, used by the archival
    /// coordinator to find prior entries to supersede on re-archive.
    fn find_entries_by_source_name(&self, source_name: &str) -> Result<Vec<EpisodeMeta>>;

    /// Delete an episode (and cascade-delete its facts) by id.
    fn delete_entry(&self, id: &str) -> Result<bool>;

    /// Delete every episode (and cascade-delete their facts) sharing a
    /// `source_name`. Returns the number of episodes deleted.
    fn delete_entries_by_source_name(&self, source_name: &str) -> Result<usize>;

    /// Full-text search over episodes, BM25-ranked (summary weighted
    /// highest, then tags, then content). `tags` further restricts hits to
    /// episodes carrying every tag in the slice (empty slice = no filter).
    fn search_fts(&self, query: &str, tags: &[String], limit: usize) -> Result<Vec<ScoredEpisode>>;

    /// Highlighted content snippet for a search hit, `>>>`/`<<<` delimited.
    fn get_snippet(&self, id: &str, query: &str) -> Result<Option<String>>;

    /// All distinct tags in use with occurrence counts.
    fn list_all_tags(&self) -> Result<Vec<(String, usize)>>;

    /// Total episode count.
    fn count_entries(&self) -> Result<usize>;

    /// Insert a new fact row.
    fn insert_fact(&self, fact: &Fact) -> Result<()>;

    /// Mark a fact as superseded by a newer one's id.
    fn supersede_fact(&self, fact_id: &str, superseded_by: &str) -> Result<()>;

    /// Facts, optionally filtered by entity and/or type, newest-first.
    /// Superseded facts are excluded unless `include_superseded` is set.
    #[allow(clippy::too_many_arguments)]
    fn list_facts(
        &self,
        entity: Option<&str>,
        fact_type: Option<&str>,
        include_superseded: bool,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Fact>>;

    /// Full-text search over fact text, optionally filtered by
    /// `fact_type`. Superseded facts are excluded unless
    /// `include_superseded` is set.
    fn search_facts_fts(
        &self,
        query: &str,
        fact_type: Option<&str>,
        include_superseded: bool,
        limit: usize,
    ) -> Result<Vec<ScoredFact>>;

    /// Non-superseded facts for one entity and fact type, the supersession
    /// lookup key used by the fact processor.
    fn find_facts_by_entity(&self, entity: &str, fact_type: &str) -> Result<Vec<Fact>>;

    /// Aggregate statistics across the whole store.
    fn get_stats(&self) -> Result<StoreStats>;

    /// Rebuild the FTS indexes from their content tables. Exposed as a
    /// hidden admin verb; not part of the normal write path.
    fn rebuild_fts(&self) -> Result<()>;
}

/// Build a [`Fact`] from a [`RawFact`] once the Fact Processor has already
/// validated and normalized it. Kept here (rather than in `facts.rs`)
/// since it only touches `Store`-adjacent identity concerns.
#[must_use]
pub fn fact_from_raw(
    raw: RawFact,
    fact_type: crate::types::FactType,
    source_entry_id: String,
) -> Fact {
    Fact {
        id: crate::types::new_fact_id(),
        fact_text: raw.fact_text,
        source_entry_id,
        entity: raw.entity,
        fact_type,
        confidence: raw.confidence,
        created_at: crate::types::unix_timestamp(),
        superseded_by: None,
    }
}
