//! Compile-time constants shared across the engine: thresholds, stopwords,
//! reserved tags, and tool-name tables.
//!
//! Centralizing these (rather than scattering magic numbers across
//! `pipeline`/`facts`/`normalizer`) mirrors how the upstream Python modules
//! kept them as module-level frozen sets.

use std::time::Duration;

/// Above this many chars, `smart_remember` takes the two-tier (summary +
/// full-content) write path instead of a single episode.
pub const SUMMARY_THRESHOLD: usize = 4000;

/// Above this many chars, a stored episode gets a chunk manifest.
pub const CHUNK_THRESHOLD: usize = 10_000;

/// Target chars per chunk when building a chunk manifest.
pub const CHUNK_TARGET_SIZE: usize = 5000;

/// Facts below this confidence are discarded before storage.
pub const MIN_CONFIDENCE: f64 = 0.75;

/// Default confidence assigned when an oracle returns a non-numeric value.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Recent-archive guard window: a session-end archive within this many
/// seconds of a precompaction archive is skipped.
pub const RECENT_ARCHIVE_GUARD_SECS: i64 = 60;

/// Bound on most CLI/query textual output.
pub const OUTPUT_CHAR_BOUND: usize = 4000;

/// Fixed number of fact hits shown in `recall`'s facts block, independent
/// of the episode-side `max`/`limit` the caller passes.
pub const RECALL_FACTS_MAX: usize = 5;

/// Default number of context lines shown around each `memory-extract
/// --grep` match when the caller doesn't supply `--context`.
pub const DEFAULT_GREP_CONTEXT: usize = 2;

/// Default per-oracle wallclock timeout.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Longer timeout for the fact-extraction oracle (larger prompts).
pub const FACT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Oracle input truncation budget: inputs larger than this are reduced to
/// head 60% + marker + tail 40% before being sent to an oracle.
pub const ORACLE_INPUT_BUDGET: usize = 12_000;

/// Maximum number of auto-derived tags when falling back without an oracle.
pub const MAX_AUTO_TAGS: usize = 8;

/// Maximum length of an auto-derived summary label.
pub const AUTO_SUMMARY_MAX_CHARS: usize = 80;

/// Valid fact types. Anything else is coerced to `observation`.
pub const FACT_TYPES: &[&str] = &[
    "decision",
    "preference",
    "relationship",
    "technical",
    "observation",
];

/// Reserved base tags the browse UI filters out when displaying "project
/// tags" (spec.md §6.5).
pub const RESERVED_TAGS: &[&str] = &[
    "conversation",
    "session",
    "summary",
    "full-content",
    "full-transcript",
    "transcript",
    "session-summary",
    "url-source",
];

/// Common English words excluded from entity normalization and auto-tagging.
/// Grounded in `rlm/memory.py::STOP_WORDS`, extended per spec.md §4.4's
/// "~80 common English words" note.
pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "that", "this", "with", "from", "are", "was", "were", "been", "being",
    "have", "has", "had", "does", "did", "will", "would", "could", "should", "may", "might",
    "can", "shall", "not", "but", "into", "about", "than", "then", "when", "where", "which",
    "while", "also", "each", "other", "some", "such", "only", "very", "just", "over", "after",
    "before", "between", "through", "during", "without", "again", "further", "once", "here",
    "there", "all", "both", "more", "most", "same", "own", "too", "any", "how", "what", "who",
    "whom", "why", "these", "those", "above", "below", "under", "use", "used", "using",
    "because", "like", "make", "made", "code", "data", "user", "users", "file", "files",
    "system", "project",
];

/// User messages (after trim/lowercase/trailing-punctuation strip) that add
/// no information and collapse to `[User confirmed]`.
pub const TRIVIAL_CONFIRMATIONS: &[&str] = &[
    "yes", "yeah", "yep", "yup", "y", "ok", "okay", "k", "sure", "sounds good", "go ahead",
    "do it", "proceed", "go for it", "looks good", "lgtm", "approved", "confirm", "continue",
    "next", "perfect", "great", "thanks", "thank you", "cool", "nice", "awesome", "right",
    "correct", "exactly", "agreed", "fine", "done", "got it",
];

/// Instructional-prompt indicator phrases. A text block ≥500 chars matching
/// two or more of these is rejected as an injected skill prompt rather than
/// real user content.
pub const SKILL_PROMPT_INDICATORS: &[&str] = &[
    "Base directory for this skill:",
    "CLI Quick Reference",
    "## Step 1:",
    "## Parse Arguments",
    "You are retrieving",
    "You are performing",
    "**Your job:**",
    "**All commands must be prefixed with:**",
];

/// Technical vocabulary scanned for fallback tag extraction when no oracle
/// is reachable.
pub const FALLBACK_TAG_VOCABULARY: &[&str] = &[
    "mcp", "hook", "hooks", "memory", "recall", "sqlite", "database", "api", "authentication",
    "auth", "testing", "test", "debugging", "performance", "optimization", "refactoring",
    "architecture", "python", "javascript", "typescript", "rust", "react", "node", "docker",
    "git", "github", "commit", "branch", "merge", "pull-request", "bug", "fix", "feature",
    "implementation", "deployment", "server", "client", "frontend", "backend", "middleware",
    "cache", "caching", "session", "semantic", "tagging", "tags",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_threshold_is_positive_and_below_chunk_threshold() {
        assert!(SUMMARY_THRESHOLD > 0);
        assert!(SUMMARY_THRESHOLD < CHUNK_THRESHOLD);
    }

    #[test]
    fn min_confidence_in_unit_interval() {
        assert!((0.0..=1.0).contains(&MIN_CONFIDENCE));
        assert!(DEFAULT_CONFIDENCE >= MIN_CONFIDENCE);
    }

    #[test]
    fn fact_types_nonempty_and_lowercase() {
        assert!(!FACT_TYPES.is_empty());
        assert!(FACT_TYPES.iter().all(|t| *t == t.to_lowercase()));
    }

    #[test]
    fn stopwords_contains_known_entries() {
        assert!(STOPWORDS.contains(&"the"));
        assert!(STOPWORDS.contains(&"and"));
    }
}
