//! Oracle Adapters (spec.md §4.3): capability traits for LM-backed
//! enrichment, each with a subprocess-backed primary implementation and a
//! deterministic fallback used when the primary is unreachable.
//!
//! Grounded in `rlm/semantic_tags.py`, `rlm/summarize.py`, and
//! `rlm/facts.py`, which each try a `claude` CLI subprocess, then an
//! Anthropic HTTP API call, before falling back to a local heuristic. The
//! HTTP fallback tier is collapsed here: `rlm-core` only shells out to
//! `oracle_command` (configurable; defaults to `claude`) and falls back
//! straight to the local heuristic on failure, since a from-scratch HTTP
//! client adds a dependency this spec's scope doesn't otherwise need.

mod process;

use crate::constants;
use crate::error::{Error, Result};
use crate::types::RawFact;

pub use process::{ProcessFactOracle, ProcessSummaryOracle, ProcessTagOracle};

/// Short (<=80 char) auto-derived label text for the single-entry write
/// path and as the basis for the two-tier path's `"Summary: "`/`"Full
/// content: "` prefixes, when the caller supplies neither an explicit
/// `label` nor (on the two-tier path) gets one from the LM. Grounded in
/// `rlm/memory.py::_auto_summary`: first non-blank, non-code-fence line,
/// heading markers and inline formatting stripped, word-boundary clipped.
#[must_use]
pub fn auto_summary(content: &str) -> String {
    FallbackSummaryOracle
        .summarize(content)
        .unwrap_or_else(|_| "(no summary available)".to_string())
}

/// Truncate oracle input to a budget, keeping the head (more likely to
/// hold task framing) and tail (more likely to hold the outcome),
/// dropping the middle behind a marker. Mirrors the 60/40 split used by
/// every oracle call in the upstream Python modules.
#[must_use]
pub fn truncate_for_oracle(text: &str, budget: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= budget {
        return text.to_string();
    }
    let head_len = (budget as f64 * 0.6) as usize;
    let tail_len = budget - head_len;
    let head: String = chars[..head_len].iter().collect();
    let tail: String = chars[chars.len() - tail_len..].iter().collect();
    format!("{head}\n\n[...truncated...]\n\n{tail}")
}

/// Extracts a bounded list of topical tags from a body of text.
pub trait TagOracle: Send + Sync {
    fn extract_tags(&self, text: &str) -> Result<Vec<String>>;
}

/// Produces a short human-readable summary label for a body of text.
pub trait SummaryOracle: Send + Sync {
    fn summarize(&self, text: &str) -> Result<String>;
}

/// Extracts atomic, entity-keyed facts from a body of text.
pub trait FactOracle: Send + Sync {
    fn extract_facts(&self, text: &str) -> Result<Vec<RawFact>>;
}

/// Keyword-matching tag fallback (grounded in
/// `rlm/semantic_tags.py::extract_keywords_fallback`): scans a fixed
/// technical vocabulary plus a few contextual patterns, capped at
/// [`constants::MAX_AUTO_TAGS`].
#[derive(Debug, Default)]
pub struct FallbackTagOracle;

impl TagOracle for FallbackTagOracle {
    fn extract_tags(&self, text: &str) -> Result<Vec<String>> {
        let lower = text.to_lowercase();
        let mut tags: Vec<String> = constants::FALLBACK_TAG_VOCABULARY
            .iter()
            .filter(|kw| lower.contains(*kw))
            .map(|kw| (*kw).to_string())
            .collect();

        if (lower.contains("bug") || lower.contains("fix")) && lower.contains("error") {
            tags.push("bug-fix".to_string());
        }
        if lower.contains("test") && (lower.contains("assert") || lower.contains("expect")) {
            tags.push("testing".to_string());
        }
        if lower.contains("refactor") {
            tags.push("refactoring".to_string());
        }

        tags.sort();
        tags.dedup();
        tags.truncate(constants::MAX_AUTO_TAGS);
        Ok(tags)
    }
}

/// First-non-blank-line summary fallback (grounded in
/// `rlm/memory.py::_auto_summary`): strips heading markers and code
/// fences, truncates to [`constants::AUTO_SUMMARY_MAX_CHARS`] on a word
/// boundary.
#[derive(Debug, Default)]
pub struct FallbackSummaryOracle;

impl SummaryOracle for FallbackSummaryOracle {
    fn summarize(&self, text: &str) -> Result<String> {
        let mut in_code_fence = false;
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.starts_with("```") {
                in_code_fence = !in_code_fence;
                continue;
            }
            if in_code_fence || line.is_empty() {
                continue;
            }
            let cleaned = line
                .trim_start_matches('#')
                .trim()
                .trim_matches(|c| c == '*' || c == '_' || c == '`' || c == '~');
            if cleaned.is_empty() {
                continue;
            }
            return Ok(truncate_on_word_boundary(cleaned, constants::AUTO_SUMMARY_MAX_CHARS));
        }
        Ok("(no summary available)".to_string())
    }
}

fn truncate_on_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind(' ') {
        Some(idx) if idx > max_chars / 2 => format!("{}...", &truncated[..idx]),
        _ => format!("{truncated}..."),
    }
}

/// Decision-cue phrases scanned by [`HeuristicSummaryOracle`] to surface
/// candidate "Key Decisions" lines.
const DECISION_CUES: &[&str] = &[
    "we chose",
    "we decided",
    "decided to",
    "we'll use",
    "going with",
    "switched to",
    "settled on",
];

/// Problem/resolution cue phrases for the "Problems Solved" section.
const PROBLEM_CUES: &[&str] = &["fixed", "resolved", "bug was", "root cause", "turned out to be"];

fn git_commit_message_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r#"git commit(?:\s+-\S+)*\s+-m\s+['"]([^'"]+)['"]"#)
            .expect("git commit message regex is valid")
    })
}

fn file_path_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"\b[\w./-]+\.(rs|py|js|ts|tsx|jsx|go|rb|toml|json|yaml|yml|md)\b")
            .expect("file path regex is valid")
    })
}

fn dedup_cap(items: &mut Vec<String>, cap: usize) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
    items.truncate(cap);
}

/// Structured multi-section summary fallback (spec.md §4.3), used when
/// the LM summary oracle is unreachable. Mines the transcript for user
/// questions ("Open Items"), decision-cue phrases and `git commit -m`
/// messages ("Key Decisions"), problem/resolution cues ("Problems
/// Solved"), and tool-call file paths ("Files Modified"). Grounded in
/// `rlm/summarize.py::extract_summary_fallback`.
#[derive(Debug, Default)]
pub struct HeuristicSummaryOracle;

impl SummaryOracle for HeuristicSummaryOracle {
    fn summarize(&self, text: &str) -> Result<String> {
        let mut decisions = Vec::new();
        let mut problems = Vec::new();
        let mut files = Vec::new();
        let mut open_items = Vec::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            let lower = line.to_lowercase();
            if let Some(caps) = git_commit_message_re().captures(line) {
                if let Some(msg) = caps.get(1) {
                    decisions.push(format!("commit: {}", msg.as_str()));
                }
            } else if DECISION_CUES.iter().any(|cue| lower.contains(cue)) {
                decisions.push(line.to_string());
            }
            if PROBLEM_CUES.iter().any(|cue| lower.contains(cue)) {
                problems.push(line.to_string());
            }
            for m in file_path_re().find_iter(line) {
                files.push(m.as_str().to_string());
            }
            if line.ends_with('?') && line.chars().count() > 10 {
                open_items.push(line.to_string());
            }
        }
        dedup_cap(&mut decisions, 5);
        dedup_cap(&mut problems, 5);
        dedup_cap(&mut files, 10);
        dedup_cap(&mut open_items, 5);

        let mut out = String::from("## Session Summary\n\n");
        out.push_str(&format!(
            "Heuristic summary derived from {} lines of transcript (no LM oracle available).\n\n",
            text.lines().count()
        ));
        out.push_str("## Key Decisions\n\n");
        push_bullets_or_none(&mut out, &decisions);
        out.push_str("\n## Problems Solved\n\n");
        push_bullets_or_none(&mut out, &problems);
        out.push_str("\n## Files Modified\n\n");
        push_bullets_or_none(&mut out, &files);
        out.push_str("\n## Open Items\n\n");
        push_bullets_or_none(&mut out, &open_items);
        Ok(out)
    }
}

fn push_bullets_or_none(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("(none identified)\n");
    } else {
        for item in items {
            out.push_str(&format!("- {item}\n"));
        }
    }
}

/// Fact-extraction fallback. Deliberately always returns an empty list:
/// a regex-based extractor (matching what the upstream Python module
/// does) produces more noise than signal, so when the LM oracle is
/// unreachable this system simply extracts no facts rather than guessing.
#[derive(Debug, Default)]
pub struct FallbackFactOracle;

impl FactOracle for FallbackFactOracle {
    fn extract_facts(&self, _text: &str) -> Result<Vec<RawFact>> {
        Ok(Vec::new())
    }
}

/// A primary oracle paired with its fallback, applying retry-once-then-
/// fallback semantics uniformly across all three capabilities.
pub struct TagOracleSet {
    pub primary: Box<dyn TagOracle>,
    pub fallback: Box<dyn TagOracle>,
}

impl TagOracleSet {
    #[must_use]
    pub fn new(primary: Box<dyn TagOracle>, fallback: Box<dyn TagOracle>) -> Self {
        Self { primary, fallback }
    }

    pub fn extract_tags(&self, text: &str) -> Vec<String> {
        run_with_fallback(
            || self.primary.extract_tags(text),
            || self.fallback.extract_tags(text),
        )
        .unwrap_or_default()
    }
}

pub struct SummaryOracleSet {
    pub primary: Box<dyn SummaryOracle>,
    pub fallback: Box<dyn SummaryOracle>,
}

impl SummaryOracleSet {
    #[must_use]
    pub fn new(primary: Box<dyn SummaryOracle>, fallback: Box<dyn SummaryOracle>) -> Self {
        Self { primary, fallback }
    }

    pub fn summarize(&self, text: &str) -> String {
        run_with_fallback(|| self.primary.summarize(text), || self.fallback.summarize(text))
            .unwrap_or_else(|| "(no summary available)".to_string())
    }
}

pub struct FactOracleSet {
    pub primary: Box<dyn FactOracle>,
    pub fallback: Box<dyn FactOracle>,
}

impl FactOracleSet {
    #[must_use]
    pub fn new(primary: Box<dyn FactOracle>, fallback: Box<dyn FactOracle>) -> Self {
        Self { primary, fallback }
    }

    pub fn extract_facts(&self, text: &str) -> Vec<RawFact> {
        run_with_fallback(
            || self.primary.extract_facts(text),
            || self.fallback.extract_facts(text),
        )
        .unwrap_or_default()
    }
}

/// Try the primary once; on a recoverable error (the oracle process
/// failed to start, timed out, or returned unparseable output), fall
/// back. Non-recoverable errors still fall back here too — every oracle
/// capability has a total fallback, so there is no case where enrichment
/// should hard-fail the ingestion pipeline.
fn run_with_fallback<T>(primary: impl FnOnce() -> Result<T>, fallback: impl FnOnce() -> Result<T>) -> Option<T> {
    match primary() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "oracle call failed, using fallback");
            match fallback() {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(error = %err, "oracle fallback also failed");
                    None
                }
            }
        }
    }
}

/// Convenience constructor for a `NotFound`-free timeout/IO error mapped
/// to [`Error::OracleUnreachable`].
pub(crate) fn oracle_unreachable(msg: impl Into<String>) -> Error {
    Error::OracleUnreachable(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_passes_short_text_through() {
        assert_eq!(truncate_for_oracle("short", 100), "short");
    }

    #[test]
    fn truncate_keeps_head_and_tail_with_marker() {
        let text: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let truncated = truncate_for_oracle(&text, 100);
        assert!(truncated.contains("[...truncated...]"));
        assert!(truncated.len() < text.len());
    }

    #[test]
    fn fallback_tag_oracle_finds_known_keywords() {
        let oracle = FallbackTagOracle;
        let tags = oracle.extract_tags("We fixed a sqlite database bug in the mcp hook").unwrap();
        assert!(tags.contains(&"sqlite".to_string()));
        assert!(tags.contains(&"database".to_string()));
        assert!(tags.contains(&"mcp".to_string()));
        assert!(tags.len() <= constants::MAX_AUTO_TAGS);
    }

    #[test]
    fn fallback_summary_oracle_skips_headings_and_code_fences() {
        let oracle = FallbackSummaryOracle;
        let text = "# Heading\n```\ncode here\n```\nActual first real line of content";
        let summary = oracle.summarize(text).unwrap();
        assert_eq!(summary, "Actual first real line of content");
    }

    #[test]
    fn heuristic_summary_oracle_surfaces_decisions_and_files() {
        let oracle = HeuristicSummaryOracle;
        let text = "We decided to use sqlite for storage.\nFixed the bug in store.rs.\nWhat should we do about caching?";
        let summary = oracle.summarize(text).unwrap();
        assert!(summary.contains("## Key Decisions"));
        assert!(summary.contains("decided to use sqlite"));
        assert!(summary.contains("store.rs"));
        assert!(summary.contains("What should we do about caching?"));
    }

    #[test]
    fn heuristic_summary_oracle_extracts_commit_messages() {
        let oracle = HeuristicSummaryOracle;
        let text = r#"ran: git commit -m "add fts index""#;
        let summary = oracle.summarize(text).unwrap();
        assert!(summary.contains("commit: add fts index"));
    }

    #[test]
    fn auto_summary_strips_headings() {
        assert_eq!(auto_summary("# Title\nActual content line"), "Actual content line");
    }

    #[test]
    fn fallback_fact_oracle_always_returns_empty() {
        let oracle = FallbackFactOracle;
        let facts = oracle
            .extract_facts("The user decided to use PostgreSQL for the new service.")
            .unwrap();
        assert!(facts.is_empty());
    }

    #[test]
    fn oracle_set_falls_back_on_primary_error() {
        struct Failing;
        impl TagOracle for Failing {
            fn extract_tags(&self, _text: &str) -> Result<Vec<String>> {
                Err(oracle_unreachable("no oracle process configured"))
            }
        }
        let set = TagOracleSet::new(Box::new(Failing), Box::new(FallbackTagOracle));
        let tags = set.extract_tags("a sqlite bug");
        assert!(tags.contains(&"sqlite".to_string()));
    }
}
