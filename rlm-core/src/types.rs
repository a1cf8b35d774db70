//! Core data types: episodes, facts, chunks, and aggregate statistics.
//!
//! Mirrors the row shapes in `rlm/db.py`, typed per spec.md §3. Episodes
//! have two representations: [`Episode`] (full row, including `content`)
//! and [`EpisodeMeta`] (the metadata-only projection returned by listing
//! and search operations) — the "strongly typed record with a parallel
//! metadata-only projection type" pattern from spec.md §9.

use serde::{Deserialize, Serialize};

/// A stored memory entry with full content (spec.md §3.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub id: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub timestamp: f64,
    pub source: String,
    pub source_name: Option<String>,
    pub char_count: usize,
    pub content: String,
    pub chunks: Option<Vec<Chunk>>,
}

impl Episode {
    /// Construct an episode, deriving `id`/`timestamp`/`char_count` and
    /// normalizing `tags` to a deduplicated, lowercase, insertion-ordered
    /// sequence.
    #[must_use]
    pub fn new(
        summary: String,
        tags: Vec<String>,
        source: impl Into<String>,
        source_name: Option<String>,
        content: String,
    ) -> Self {
        let char_count = content.chars().count();
        Self {
            id: new_episode_id(),
            summary,
            tags: dedup_lowercase(tags),
            timestamp: unix_timestamp(),
            source: source.into(),
            source_name,
            char_count,
            content,
            chunks: None,
        }
    }

    /// Metadata-only projection (no `content`, no `chunks`).
    #[must_use]
    pub fn to_meta(&self) -> EpisodeMeta {
        EpisodeMeta {
            id: self.id.clone(),
            summary: self.summary.clone(),
            tags: self.tags.clone(),
            timestamp: self.timestamp,
            source: self.source.clone(),
            source_name: self.source_name.clone(),
            char_count: self.char_count,
        }
    }

    /// Size category used by the query surface's recall annotations
    /// (spec.md §4.7).
    #[must_use]
    pub fn size_category(&self) -> SizeCategory {
        SizeCategory::of(self.char_count)
    }
}

/// Metadata-only projection of an [`Episode`] (no `content`/`chunks`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeMeta {
    pub id: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub timestamp: f64,
    pub source: String,
    pub source_name: Option<String>,
    pub char_count: usize,
}

/// An episode returned from full-text search, with its BM25-derived score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredEpisode {
    #[serde(flatten)]
    pub meta: EpisodeMeta,
    pub score: f64,
}

/// Size bucket used for recall-output annotation and aggregate stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeCategory {
    /// <= 2KB
    Small,
    /// 2KB - 10KB
    Medium,
    /// 10KB - 50KB
    Large,
    /// > 50KB
    Huge,
}

impl SizeCategory {
    #[must_use]
    pub fn of(char_count: usize) -> Self {
        match char_count {
            0..=2000 => SizeCategory::Small,
            2001..=10_000 => SizeCategory::Medium,
            10_001..=50_000 => SizeCategory::Large,
            _ => SizeCategory::Huge,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Large => "large",
            SizeCategory::Huge => "huge",
        }
    }

    /// Whether drilldown guidance (grep-for-context-efficient-retrieval)
    /// should be appended in recall output.
    #[must_use]
    pub fn needs_drilldown_hint(self) -> bool {
        matches!(self, SizeCategory::Large | SizeCategory::Huge)
    }
}

/// An offset into a large episode's content, indexing rather than
/// duplicating it (spec.md §3.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub start_char: usize,
    pub end_char: usize,
    pub char_count: usize,
    pub preview: String,
}

/// The five closed fact kinds (spec.md §3.2). Anything else the oracle or
/// a caller supplies is coerced to `Observation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactType {
    Decision,
    Preference,
    Relationship,
    Technical,
    Observation,
}

impl FactType {
    /// Parse a (possibly arbitrary-case, possibly unknown) string,
    /// coercing anything outside the fixed set to `Observation`.
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "decision" => FactType::Decision,
            "preference" => FactType::Preference,
            "relationship" => FactType::Relationship,
            "technical" => FactType::Technical,
            _ => FactType::Observation,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FactType::Decision => "decision",
            FactType::Preference => "preference",
            FactType::Relationship => "relationship",
            FactType::Technical => "technical",
            FactType::Observation => "observation",
        }
    }
}

/// An atomic, independently queryable claim extracted from an episode
/// (spec.md §3.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fact {
    pub id: String,
    pub fact_text: String,
    pub source_entry_id: String,
    pub entity: Option<String>,
    pub fact_type: FactType,
    pub confidence: f64,
    pub created_at: f64,
    pub superseded_by: Option<String>,
}

/// A raw fact as produced by the fact oracle, before normalization by the
/// Fact Processor (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawFact {
    pub fact_text: String,
    pub entity: Option<String>,
    pub fact_type: String,
    pub confidence: f64,
}

/// Result of a `smart_remember` pipeline run (spec.md §4.5 step 7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RememberOutcome {
    /// The primary episode id (summary episode in two-tier writes).
    pub summary_id: String,
    /// The full-content episode id, present only for two-tier writes.
    pub content_id: Option<String>,
    /// Human-readable label text for the primary episode.
    pub summary: String,
    pub tags: Vec<String>,
    pub facts_count: usize,
}

/// Aggregate store statistics (spec.md §4.1 `get_stats`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StoreStats {
    pub total_entries: usize,
    pub total_chars: usize,
    pub size_small: usize,
    pub size_medium: usize,
    pub size_large: usize,
    pub size_huge: usize,
    pub by_source: Vec<(String, usize)>,
    pub oldest_timestamp: Option<f64>,
    pub newest_timestamp: Option<f64>,
    pub top_tags: Vec<(String, usize)>,
    pub db_file_size_bytes: u64,
}

fn dedup_lowercase(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let lower = tag.trim().to_lowercase();
        if lower.is_empty() {
            continue;
        }
        if seen.insert(lower.clone()) {
            out.push(lower);
        }
    }
    out
}

/// Generate a new episode id: `m_` + 12 hex chars of entropy.
#[must_use]
pub fn new_episode_id() -> String {
    format!("m_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Generate a new fact id: `f_` + 12 hex chars of entropy.
#[must_use]
pub fn new_fact_id() -> String {
    format!("f_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Current wall-clock time, seconds since epoch.
#[must_use]
pub fn unix_timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_char_count_matches_content_length() {
        let ep = Episode::new(
            "test".to_string(),
            vec!["a".to_string()],
            "text",
            None,
            "hello world".to_string(),
        );
        assert_eq!(ep.char_count, ep.content.chars().count());
    }

    #[test]
    fn episode_id_has_m_prefix_and_twelve_hex_chars() {
        let id = new_episode_id();
        assert!(id.starts_with("m_"));
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn fact_id_has_f_prefix() {
        let id = new_fact_id();
        assert!(id.starts_with("f_"));
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn tags_are_deduplicated_case_insensitively_preserving_order() {
        let ep = Episode::new(
            "s".to_string(),
            vec!["Python".to_string(), "python".to_string(), "rust".to_string()],
            "text",
            None,
            "c".to_string(),
        );
        assert_eq!(ep.tags, vec!["python".to_string(), "rust".to_string()]);
    }

    #[test]
    fn fact_type_coerces_unknown_to_observation() {
        assert_eq!(FactType::coerce("DECISION"), FactType::Decision);
        assert_eq!(FactType::coerce("bogus"), FactType::Observation);
    }

    #[test]
    fn size_category_boundaries() {
        assert_eq!(SizeCategory::of(2000), SizeCategory::Small);
        assert_eq!(SizeCategory::of(2001), SizeCategory::Medium);
        assert_eq!(SizeCategory::of(10_000), SizeCategory::Medium);
        assert_eq!(SizeCategory::of(10_001), SizeCategory::Large);
        assert_eq!(SizeCategory::of(50_000), SizeCategory::Large);
        assert_eq!(SizeCategory::of(50_001), SizeCategory::Huge);
    }
}
