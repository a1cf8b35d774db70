//! Query Surface (spec.md §4.7): read-side operations over the store,
//! each formatted into compact, bounded text suitable for an agent's
//! context window.
//!
//! Grounded in `rlm/memory.py`'s `format_index_summary`/
//! `format_search_results` bounded-output helpers, generalized to the
//! recall/list/extract/stats operations spec.md §4.7 and §6 describe.

use crate::constants;
use crate::error::{Error, Result};
use crate::store::{ListFilter, Store};
use crate::types::{Fact, ScoredEpisode, SizeCategory};

/// How `memory_extract` should project a stored episode.
pub enum ExtractMode {
    /// The full stored content, unbounded.
    Full,
    /// One chunk from the episode's chunk manifest, by chunk id.
    Chunk(String),
    /// Every line of content matching a literal substring, each
    /// annotated with its line number, surrounded by the given number
    /// of context lines. Non-contiguous match groups are joined with a
    /// `---` separator.
    Grep(String, usize),
}

/// Full-text search across episodes and facts, combined into one bounded
/// result with size-category annotations and a drilldown hint for
/// large/huge episodes. `deep` is accepted but currently a no-op: FTS
/// already indexes full episode content, so there is no separate "deep"
/// index to opt into. `tags`, when non-empty, restricts episode hits to
/// those carrying every tag in the slice. The facts block is always
/// capped at [`constants::RECALL_FACTS_MAX`] hits regardless of `limit`,
/// and renders before the episodes block.
///
/// # Errors
/// Propagates storage errors from the underlying FTS queries.
pub fn recall(store: &dyn Store, query: &str, tags: &[String], limit: usize, deep: bool) -> Result<String> {
    let _ = deep;
    let facts = store.search_facts_fts(query, None, false, constants::RECALL_FACTS_MAX)?;
    let episodes = store.search_fts(query, tags, limit)?;

    if episodes.is_empty() && facts.is_empty() {
        return Ok(format!("No results for \"{query}\"."));
    }

    let mut out = String::new();
    if !facts.is_empty() {
        out.push_str(&format!("## Facts ({})\n", facts.len()));
        for hit in &facts {
            out.push_str(&format!(
                "- [{}] {} (entity: {}, confidence: {:.2})\n",
                hit.fact.fact_type.as_str(),
                hit.fact.fact_text,
                hit.fact.entity.as_deref().unwrap_or("-"),
                hit.fact.confidence
            ));
        }
    }
    if !episodes.is_empty() {
        if !facts.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("## Episodes ({})\n", episodes.len()));
        for hit in &episodes {
            out.push_str(&format_episode_hit(hit));
        }
    }

    Ok(bound_output(&out, constants::OUTPUT_CHAR_BOUND))
}

fn format_episode_hit(hit: &ScoredEpisode) -> String {
    let category = SizeCategory::of(hit.meta.char_count);
    let mut line = format!(
        "- [{}] {} (score: {:.2}, {} chars, {})\n",
        hit.meta.id,
        hit.meta.summary,
        hit.score,
        hit.meta.char_count,
        category.label()
    );
    if category.needs_drilldown_hint() {
        line.push_str(&format!(
            "  (large episode: use memory-extract --id {} --grep <term> for targeted retrieval)\n",
            hit.meta.id
        ));
    }
    line
}

/// Paginated episode metadata listing, optionally filtered by tags
/// (intersection: an entry must carry every tag given).
///
/// # Errors
/// Propagates storage errors.
pub fn memory_list(store: &dyn Store, tags: &[String], limit: usize, offset: usize) -> Result<String> {
    let filter = ListFilter {
        tags: tags.to_vec(),
        limit: Some(limit),
        offset,
    };
    let entries = store.list_entries(&filter)?;
    if entries.is_empty() {
        return Ok("No entries found.".to_string());
    }
    let mut out = format!("## Entries ({})\n", entries.len());
    for entry in &entries {
        out.push_str(&format!(
            "- [{}] {} ({} chars, tags: {})\n",
            entry.id,
            entry.summary,
            entry.char_count,
            entry.tags.join(", ")
        ));
    }
    Ok(bound_output(&out, constants::OUTPUT_CHAR_BOUND))
}

/// Project a stored episode's content per `mode`. `ExtractMode::Full` is
/// deliberately unbounded (spec.md §6.1's `export-session` / full-extract
/// exemption from the usual output cap); chunk and grep projections are
/// inherently small and need no bound either.
///
/// # Errors
/// Returns [`Error::NotFound`] if the episode, or the requested chunk id
/// within it, doesn't exist.
pub fn memory_extract(store: &dyn Store, id: &str, mode: ExtractMode) -> Result<String> {
    let episode = store
        .get_entry(id)?
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

    match mode {
        ExtractMode::Full => Ok(episode.content),
        ExtractMode::Chunk(chunk_id) => {
            let chunks = episode.chunks.unwrap_or_default();
            let chunk = chunks
                .into_iter()
                .find(|c| c.chunk_id == chunk_id)
                .ok_or_else(|| Error::NotFound(format!("chunk {chunk_id} in {id}")))?;
            let chars: Vec<char> = episode.content.chars().collect();
            let end = chunk.end_char.min(chars.len());
            let start = chunk.start_char.min(end);
            Ok(chars[start..end].iter().collect())
        }
        ExtractMode::Grep(pattern, context) => {
            Ok(grep_with_context(&episode.content, &pattern, context)
                .unwrap_or_else(|| format!("No lines matching \"{pattern}\" in {id}.")))
        }
    }
}

/// Find every line containing `pattern`, expand each match by `context`
/// lines on either side, merge overlapping/adjacent ranges, and render
/// each resulting group as `N: line` entries joined by `---` between
/// non-contiguous groups. Returns `None` when there are no matches.
/// Grounded in spec.md §4.7's grep-with-context projection.
fn grep_with_context(content: &str, pattern: &str, context: usize) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    let match_indices: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(pattern))
        .map(|(i, _)| i)
        .collect();
    if match_indices.is_empty() {
        return None;
    }

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &i in &match_indices {
        let start = i.saturating_sub(context);
        let end = (i + context).min(lines.len().saturating_sub(1));
        match ranges.last_mut() {
            Some((_, last_end)) if start <= *last_end + 1 => {
                *last_end = (*last_end).max(end);
            }
            _ => ranges.push((start, end)),
        }
    }

    let groups: Vec<String> = ranges
        .into_iter()
        .map(|(start, end)| {
            lines[start..=end]
                .iter()
                .enumerate()
                .map(|(offset, line)| format!("{}: {}", start + offset + 1, line))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();

    Some(groups.join("\n---\n"))
}

/// List facts, optionally filtered by entity and/or type, excluding
/// superseded ones unless `include_superseded` is set.
///
/// # Errors
/// Propagates storage errors.
#[allow(clippy::too_many_arguments)]
pub fn list_facts(
    store: &dyn Store,
    entity: Option<&str>,
    fact_type: Option<&str>,
    include_superseded: bool,
    limit: usize,
    offset: usize,
) -> Result<String> {
    let facts = store.list_facts(entity, fact_type, include_superseded, limit, offset)?;
    if facts.is_empty() {
        return Ok("No facts found.".to_string());
    }
    Ok(bound_output(&format_facts(&facts), constants::OUTPUT_CHAR_BOUND))
}

fn format_facts(facts: &[Fact]) -> String {
    let mut out = format!("## Facts ({})\n", facts.len());
    for fact in facts {
        out.push_str(&format!(
            "- [{}] {} (entity: {}, confidence: {:.2})\n",
            fact.fact_type.as_str(),
            fact.fact_text,
            fact.entity.as_deref().unwrap_or("-"),
            fact.confidence
        ));
    }
    out
}

/// Store-wide aggregate statistics, formatted for display.
///
/// # Errors
/// Propagates storage errors.
pub fn stats(store: &dyn Store) -> Result<String> {
    let s = store.get_stats()?;
    let mut out = format!(
        "Entries: {} ({} chars total)\nSizes: small={} medium={} large={} huge={}\nDB file size: {} bytes\n",
        s.total_entries, s.total_chars, s.size_small, s.size_medium, s.size_large, s.size_huge, s.db_file_size_bytes
    );
    if !s.top_tags.is_empty() {
        out.push_str("Top tags: ");
        out.push_str(
            &s.top_tags
                .iter()
                .map(|(tag, count)| format!("{tag} ({count})"))
                .collect::<Vec<_>>()
                .join(", "),
        );
        out.push('\n');
    }
    Ok(out)
}

/// Truncate formatted output to `max_chars`, appending a count of how
/// many trailing lines were dropped rather than silently chopping
/// mid-line. Grounded in `rlm/memory.py::format_search_results`.
fn bound_output(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let lines: Vec<&str> = text.lines().collect();
    let mut out = String::new();
    let mut included = 0;
    for line in &lines {
        if out.chars().count() + line.chars().count() + 1 > max_chars {
            break;
        }
        out.push_str(line);
        out.push('\n');
        included += 1;
    }
    let remaining = lines.len().saturating_sub(included);
    if remaining > 0 {
        out.push_str(&format!("... and {remaining} more line(s) (truncated)\n"));
    }
    out
}
