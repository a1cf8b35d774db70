//! Ingestion Pipeline (spec.md §4.5): `smart_remember`, the single entry
//! point every write path (CLI `remember`, MCP `remember`/`remember_url`,
//! and the archival coordinator) funnels through.
//!
//! Grounded in `rlm/memory.py`'s auto-tagging/auto-summary/chunking
//! helpers, composed with the Oracle Adapters (§4.3) and Fact Processor
//! (§4.4) modules into the seven-step flow spec.md §4.5 describes:
//! optional dedup, tag extraction, two-tier threshold-gated write,
//! chunk-manifest construction, non-fatal fact extraction, and a bounded
//! result summary.

use crate::config::EngineConfig;
use crate::constants;
use crate::error::Result;
use crate::facts;
use crate::oracle::{self, FactOracleSet, SummaryOracleSet, TagOracleSet};
use crate::store::Store;
use crate::types::{Chunk, Episode, RememberOutcome};

/// Parameters for one `smart_remember` call.
pub struct RememberRequest {
    pub content: String,
    pub source: String,
    pub source_name: Option<String>,
    pub user_tags: Vec<String>,
    /// Caller-supplied label overriding the auto-derived summary/label
    /// text. Used verbatim as the episode `summary` field for the
    /// single-entry path, and as the basis for the `"Summary: "`/
    /// `"Full content: "` prefixes on the two-tier path.
    pub label: Option<String>,
    /// When true, any existing entries sharing `source_name` are deleted
    /// before the new write. The archival coordinator performs its own
    /// dedup pass up front and always calls with this `false` to avoid
    /// doing it twice.
    pub dedup: bool,
}

/// Store `content`, enriching it with tags, a summary, a chunk manifest
/// (if large), and extracted facts, applying the two-tier write split
/// above [`EngineConfig::summary_threshold`].
///
/// # Errors
/// Returns an error only for a storage failure on the primary write.
/// Oracle and fact-extraction failures are already absorbed by
/// [`TagOracleSet`]/[`SummaryOracleSet`]/[`FactOracleSet`]'s own
/// fallback semantics and by this function logging-and-continuing on a
/// fact storage error, so a partially enriched but successfully stored
/// episode is the worst case, never a failed call.
pub fn smart_remember(
    store: &dyn Store,
    cfg: &EngineConfig,
    tag_oracle: &TagOracleSet,
    summary_oracle: &SummaryOracleSet,
    fact_oracle: &FactOracleSet,
    req: RememberRequest,
) -> Result<RememberOutcome> {
    if req.dedup {
        if let Some(name) = &req.source_name {
            store.delete_entries_by_source_name(name)?;
        }
    }

    let mut all_tags = req.user_tags;
    all_tags.extend(tag_oracle.extract_tags(&req.content));
    let mut all_tags = dedup_lowercase(all_tags);
    if all_tags.is_empty() {
        all_tags = auto_tags(&req.content);
    }

    let char_count = req.content.chars().count();
    let name_or_source = req.source_name.as_deref().unwrap_or(&req.source).to_string();

    let (summary_id, content_id, primary_entry_id, facts_input, label_text) =
        if char_count > cfg.summary_threshold {
            let summary_text = summary_oracle.summarize(&req.content);

            let mut summary_tags = vec!["summary".to_string()];
            summary_tags.extend(all_tags.clone());
            let summary_label = req
                .label
                .clone()
                .unwrap_or_else(|| format!("Summary: {name_or_source}"));
            let summary_entry = Episode::new(
                summary_label.clone(),
                summary_tags,
                format!("{}-summary", req.source),
                req.source_name.clone(),
                summary_text.clone(),
            );
            store.upsert_entry(&summary_entry)?;

            let mut full_tags = vec!["full-content".to_string()];
            full_tags.extend(all_tags.clone());
            let full_label = format!("Full content: {name_or_source}");
            let mut full = Episode::new(
                full_label,
                full_tags,
                req.source.clone(),
                req.source_name.clone(),
                req.content.clone(),
            );
            if char_count > cfg.chunk_threshold {
                full.chunks = Some(chunk_content(&full.id, &req.content));
            }
            store.upsert_entry(&full)?;

            (
                summary_entry.id.clone(),
                Some(full.id.clone()),
                summary_entry.id,
                summary_text,
                summary_label,
            )
        } else {
            let label = req
                .label
                .clone()
                .unwrap_or_else(|| oracle::auto_summary(&req.content));
            let mut entry = Episode::new(
                label.clone(),
                all_tags.clone(),
                req.source.clone(),
                req.source_name.clone(),
                req.content.clone(),
            );
            if char_count > cfg.chunk_threshold {
                entry.chunks = Some(chunk_content(&entry.id, &req.content));
            }
            store.upsert_entry(&entry)?;
            (entry.id.clone(), None, entry.id, req.content.clone(), label)
        };

    let raw_facts = fact_oracle.extract_facts(&facts_input);
    let facts_count = match facts::store_facts(store, &primary_entry_id, raw_facts, cfg.min_confidence) {
        Ok(stored) => stored.len(),
        Err(err) => {
            tracing::warn!(error = %err, "fact storage failed, continuing without facts");
            0
        }
    };

    Ok(RememberOutcome {
        summary_id,
        content_id,
        summary: label_text,
        tags: all_tags,
        facts_count,
    })
}

/// Derive up to [`constants::MAX_AUTO_TAGS`] lowercase tags from `content`
/// when neither user-supplied nor oracle-extracted tags are available:
/// case-fold, strip punctuation, drop stopwords and short tokens, keep
/// only tokens repeated at least twice, ordered by descending frequency.
/// Grounded in `rlm/memory.py::_auto_tags`.
#[must_use]
pub fn auto_tags(content: &str) -> Vec<String> {
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for raw_word in content.split_whitespace() {
        let token: String = raw_word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if token.chars().count() < 4 || constants::STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if !counts.contains_key(&token) {
            order.push(token.clone());
        }
        *counts.entry(token).or_insert(0) += 1;
    }
    let mut repeated: Vec<(String, usize)> = order
        .into_iter()
        .filter_map(|tok| counts.get(&tok).filter(|&&n| n >= 2).map(|&n| (tok, n)))
        .collect();
    repeated.sort_by(|a, b| b.1.cmp(&a.1));
    repeated.into_iter().take(constants::MAX_AUTO_TAGS).map(|(tok, _)| tok).collect()
}

fn dedup_lowercase(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let lower = tag.trim().to_lowercase();
        if !lower.is_empty() && seen.insert(lower.clone()) {
            out.push(lower);
        }
    }
    out
}

/// Split `content` on paragraph boundaries into a manifest of chunks
/// targeting [`constants::CHUNK_TARGET_SIZE`] chars each, with
/// deterministic MD5-derived ids so repeated chunking of the same
/// content (e.g. after a `rebuild_fts`) is stable. Grounded in
/// `rlm/memory.py::_chunk_content`.
#[must_use]
pub fn chunk_content(entry_id: &str, content: &str) -> Vec<Chunk> {
    let paragraphs = split_paragraphs(content);
    let mut chunks = Vec::new();
    let mut current_start = 0usize;
    let mut current = String::new();
    let mut cursor = 0usize;

    for para in paragraphs {
        let para_len = para.chars().count();
        if !current.is_empty() && current.chars().count() + para_len > constants::CHUNK_TARGET_SIZE {
            chunks.push(build_chunk(entry_id, &current, current_start, cursor));
            current_start = cursor;
            current.clear();
        }
        if current.is_empty() {
            current_start = cursor;
        }
        current.push_str(para);
        cursor += para_len;
    }
    if !current.is_empty() {
        chunks.push(build_chunk(entry_id, &current, current_start, cursor));
    }
    chunks
}

fn build_chunk(entry_id: &str, text: &str, start: usize, end: usize) -> Chunk {
    let char_count = text.chars().count();
    let preview: String = text.chars().take(80).collect();
    let digest = format!("{:x}", md5::compute(format!("{entry_id}:{start}:{end}")));
    let chunk_id = format!("mc_{}", &digest[..10]);
    Chunk {
        chunk_id,
        start_char: start,
        end_char: end,
        char_count,
        preview,
    }
}

/// Split on blank-line paragraph boundaries, keeping each paragraph's
/// trailing separator attached so offsets remain faithful to the
/// original content.
fn split_paragraphs(content: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let bytes = content.as_bytes();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            let mut blank_run = true;
            let line_start = i + 1;
            while j < bytes.len() && bytes[j] != b'\n' {
                if !bytes[j].is_ascii_whitespace() {
                    blank_run = false;
                    break;
                }
                j += 1;
            }
            if blank_run && j < bytes.len() {
                out.push(&content[start..line_start]);
                start = line_start;
            }
        }
        i += 1;
    }
    if start < content.len() {
        out.push(&content[start..]);
    }
    if out.is_empty() && !content.is_empty() {
        out.push(content);
    }
    out
}
