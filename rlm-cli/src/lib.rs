//! Command definitions and dispatch logic for the `rlm` CLI.
//!
//! Kept as a library (with `main.rs` as a thin wrapper) so the dispatch
//! logic is unit-testable directly, and so `assert_cmd`-based
//! integration tests exercise the exact same code path as the shipped
//! binary. Verb surface and bounded-output convention are grounded in
//! spec.md §6.1 and `rlm/memory.py`'s formatting helpers.

use std::io::Read as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rlm_core::archive::{archive_session, ArchiveEvent, ArchiveTrigger};
use rlm_core::constants;
use rlm_core::oracle::{
    FactOracleSet, FallbackFactOracle, FallbackTagOracle, HeuristicSummaryOracle, ProcessFactOracle,
    ProcessSummaryOracle, ProcessTagOracle, SummaryOracleSet, TagOracleSet,
};
use rlm_core::pipeline::{smart_remember, RememberRequest};
use rlm_core::query::{self, ExtractMode};
use rlm_core::EngineConfig;
use rlm_storage_sqlite::SqliteStore;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rlm", about = "Local-first episodic memory for coding-agent sessions")]
pub struct Cli {
    /// Override the database path (defaults to `EngineConfig::default`'s
    /// `~/.rlm/memory/memory.db`, itself overridable via `RLM_DB_PATH`).
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a piece of content, enriched with tags/summary/facts. With
    /// no input source at all, archives the current session log instead.
    Remember {
        /// Inline content. Mutually exclusive with `--file`/`--url`/`--stdin`.
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Fetch a URL and remember its content.
        #[arg(long)]
        url: Option<String>,
        /// Read content from stdin explicitly (as opposed to the
        /// no-input-at-all archival fallback).
        #[arg(long)]
        stdin: bool,
        #[arg(long = "tags", value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        source_name: Option<String>,
        /// Override the auto-derived summary/label text.
        #[arg(long)]
        summary: Option<String>,
        /// Accepted for surface parity with `recall --deep`; this verb
        /// has no retrieval depth of its own to vary.
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Full-text search across episodes and facts.
    Recall {
        query: String,
        #[arg(long = "tags", value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value_t = 10)]
        max: usize,
        /// Accepted and ignored: FTS already indexes full episode content.
        #[arg(long)]
        deep: bool,
    },
    /// List stored episodes, optionally filtered by tags (intersection).
    MemoryList {
        #[arg(long = "tags", value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Project a stored episode's content: full, one chunk, or grep.
    MemoryExtract {
        entry_id: String,
        #[arg(long)]
        chunk_id: Option<String>,
        #[arg(long)]
        grep: Option<String>,
        #[arg(long)]
        context: Option<usize>,
    },
    /// List all distinct tags with occurrence counts.
    MemoryTags,
    /// Delete a stored episode by id.
    Forget { entry_id: String },
    /// List or search extracted facts.
    Facts {
        /// Full-text search query; omit for a plain filtered listing.
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        entity: Option<String>,
        #[arg(long = "type")]
        fact_type: Option<String>,
        #[arg(long)]
        include_superseded: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Store-wide aggregate statistics.
    Stats,
    /// Normalize a raw transcript file and print it, unbounded.
    ExportSession {
        session_file: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Hook entry points invoked by the coding agent's lifecycle events.
    Hook {
        #[command(subcommand)]
        event: HookEvent,
    },
    /// Maintenance operations not part of the normal write path.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum HookEvent {
    /// Fired before the agent's context window is compacted.
    PreCompaction,
    /// Fired at session end.
    SessionEnd,
}

#[derive(Debug, Subcommand)]
pub enum AdminAction {
    /// Rebuild both FTS5 indexes from their content tables.
    RebuildFts,
}

/// A hook event's JSON payload on stdin, per spec.md §6.2. `transcript_path`
/// is authoritative; `cwd` drives project-name derivation. `session_id` is
/// not guaranteed by the protocol (only `transcript_path`/`cwd` are), so a
/// missing value falls back to the transcript file's stem.
#[derive(Debug, serde::Deserialize)]
struct HookPayload {
    transcript_path: PathBuf,
    cwd: PathBuf,
    #[serde(default)]
    session_id: Option<String>,
}

fn resolve_config(cli: &Cli) -> EngineConfig {
    let mut cfg = EngineConfig::from_env();
    if let Some(path) = &cli.db_path {
        cfg.db_path = path.clone();
    }
    cfg
}

fn build_oracles(cfg: &EngineConfig) -> (TagOracleSet, SummaryOracleSet, FactOracleSet) {
    let tag_oracle = TagOracleSet::new(
        Box::new(ProcessTagOracle {
            command: cfg.oracle_command.clone(),
            timeout: cfg.oracle_timeout,
        }),
        Box::new(FallbackTagOracle),
    );
    let summary_oracle = SummaryOracleSet::new(
        Box::new(ProcessSummaryOracle {
            command: cfg.oracle_command.clone(),
            timeout: cfg.oracle_timeout,
        }),
        Box::new(HeuristicSummaryOracle),
    );
    let fact_oracle = FactOracleSet::new(
        Box::new(ProcessFactOracle {
            command: cfg.oracle_command.clone(),
            timeout: cfg.fact_oracle_timeout,
        }),
        Box::new(FallbackFactOracle),
    );
    (tag_oracle, summary_oracle, fact_oracle)
}

/// Execute one CLI invocation, returning the text that should be printed
/// to stdout.
///
/// # Errors
/// Returns an error for storage failures, missing files, and `forget`/
/// `memory-extract` targeting a nonexistent id (mapped through
/// [`rlm_core::error::Error::is_not_found`] to a clean "not found"
/// message rather than a raw error dump). `Hook` never returns an error:
/// per spec.md §6.2, hook failures are logged to stderr and swallowed so
/// the host runtime's lifecycle is never blocked.
pub fn dispatch(cli: Cli) -> Result<String> {
    let cfg = resolve_config(&cli);
    let store = SqliteStore::new(cfg.db_path.clone());

    match cli.command {
        Command::Remember {
            content,
            file,
            url,
            stdin,
            tags,
            source_name,
            summary,
            depth: _,
        } => {
            let (tag_oracle, summary_oracle, fact_oracle) = build_oracles(&cfg);
            match read_remember_input(content, file, url, stdin)? {
                Some((content, source, source_name_override)) => {
                    let outcome = smart_remember(
                        &store,
                        &cfg,
                        &tag_oracle,
                        &summary_oracle,
                        &fact_oracle,
                        RememberRequest {
                            content,
                            source,
                            source_name: source_name_override.or(source_name),
                            user_tags: tags,
                            label: summary,
                            dedup: true,
                        },
                    )?;
                    Ok(format!(
                        "Stored {} ({} tags, {} facts): {}",
                        outcome.summary_id,
                        outcome.tags.len(),
                        outcome.facts_count,
                        outcome.summary
                    ))
                }
                None => {
                    let event = current_session_event(ArchiveTrigger::SessionEnd)?;
                    let (tag_oracle, summary_oracle, fact_oracle) = build_oracles(&cfg);
                    match archive_session(&store, &cfg, &tag_oracle, &summary_oracle, &fact_oracle, &event)? {
                        Some(outcome) => Ok(format!("Archived session as {}", outcome.summary_id)),
                        None => Ok("No input given and no current session to archive.".to_string()),
                    }
                }
            }
        }
        Command::Recall { query: q, tags, max, deep } => {
            Ok(query::recall(&store, &q, &tags, max, deep)?)
        }
        Command::MemoryList { tags, limit, offset } => {
            Ok(query::memory_list(&store, &tags, limit, offset)?)
        }
        Command::MemoryExtract { entry_id, chunk_id, grep, context } => {
            let mode = match (chunk_id, grep) {
                (Some(chunk_id), _) => ExtractMode::Chunk(chunk_id),
                (None, Some(pattern)) => {
                    ExtractMode::Grep(pattern, context.unwrap_or(constants::DEFAULT_GREP_CONTEXT))
                }
                (None, None) => ExtractMode::Full,
            };
            Ok(query::memory_extract(&store, &entry_id, mode)?)
        }
        Command::MemoryTags => {
            use rlm_core::store::Store as _;
            let tags = store.list_all_tags()?;
            if tags.is_empty() {
                Ok("No tags found.".to_string())
            } else {
                Ok(tags
                    .into_iter()
                    .map(|(tag, count)| format!("{tag} ({count})"))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
        Command::Forget { entry_id } => {
            use rlm_core::store::Store as _;
            let deleted = store.delete_entry(&entry_id)?;
            if deleted {
                Ok(format!("Deleted {entry_id}"))
            } else {
                Ok(format!("No entry found with id {entry_id}"))
            }
        }
        Command::Facts {
            query: q,
            entity,
            fact_type,
            include_superseded,
            limit,
            offset,
        } => {
            if let Some(q) = q {
                use rlm_core::store::Store as _;
                let hits = store.search_facts_fts(&q, fact_type.as_deref(), include_superseded, limit)?;
                if hits.is_empty() {
                    Ok(format!("No facts matching \"{q}\"."))
                } else {
                    Ok(hits
                        .into_iter()
                        .map(|h| format!("[{:.2}] [{}] {}", h.score, h.fact.fact_type.as_str(), h.fact.fact_text))
                        .collect::<Vec<_>>()
                        .join("\n"))
                }
            } else {
                Ok(query::list_facts(
                    &store,
                    entity.as_deref(),
                    fact_type.as_deref(),
                    include_superseded,
                    limit,
                    offset,
                )?)
            }
        }
        Command::Stats => Ok(query::stats(&store)?),
        Command::ExportSession { session_file, output } => {
            let raw = std::fs::read_to_string(&session_file)
                .with_context(|| format!("reading transcript file {}", session_file.display()))?;
            let label = session_file.to_string_lossy().to_string();
            let transcript = rlm_core::normalizer::normalize_transcript(&raw, &label);
            if let Some(out_path) = output {
                std::fs::write(&out_path, &transcript)
                    .with_context(|| format!("writing export to {}", out_path.display()))?;
                Ok(format!("Wrote transcript to {}", out_path.display()))
            } else {
                Ok(transcript)
            }
        }
        Command::Hook { event } => Ok(run_hook(&store, &cfg, event)),
        Command::Admin { action } => match action {
            AdminAction::RebuildFts => {
                use rlm_core::store::Store as _;
                store.rebuild_fts()?;
                Ok("FTS indexes rebuilt.".to_string())
            }
        },
    }
}

/// Resolve `(content, source, source)` for the `remember` verb from its
/// input flags. Returns `Ok(None)` when no input source was given at
/// all, signaling the caller to fall back to session archival per
/// spec.md §6.1. `.jsonl` files are normalized before ingestion.
fn read_remember_input(
    content: Option<String>,
    file: Option<PathBuf>,
    url: Option<String>,
    stdin: bool,
) -> Result<Option<(String, String, Option<String>)>> {
    match (content, file, url, stdin) {
        (Some(c), _, _, _) => Ok(Some((c, "text".to_string(), None))),
        (None, Some(path), _, _) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let content = if path.extension().and_then(std::ffi::OsStr::to_str) == Some("jsonl") {
                let label = path.to_string_lossy().to_string();
                rlm_core::normalizer::normalize_transcript(&raw, &label)
            } else {
                raw
            };
            Ok(Some((content, "file".to_string(), Some(path.to_string_lossy().to_string()))))
        }
        (None, None, Some(url), _) => {
            let body = reqwest::blocking::get(&url)
                .with_context(|| format!("fetching {url}"))?
                .text()
                .with_context(|| format!("reading response body from {url}"))?;
            Ok(Some((body, "url".to_string(), Some(url))))
        }
        (None, None, None, true) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading content from stdin")?;
            Ok(Some((buf, "stdin".to_string(), None)))
        }
        (None, None, None, false) => Ok(None),
    }
}

/// Build an [`ArchiveEvent`] for the current working directory's session,
/// used by `remember` with no input source at all.
fn current_session_event(trigger: ArchiveTrigger) -> Result<ArchiveEvent> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let session_path = find_most_recent_session_log(&cwd).unwrap_or_else(|| cwd.join("session.jsonl"));
    Ok(ArchiveEvent {
        session_path,
        cwd,
        session_id: "cli-invoked".to_string(),
        trigger,
    })
}

/// Fallback session-log discovery: the most-recently-modified `.jsonl`
/// file directly under `cwd`, used when no event payload names one
/// explicitly. Mirrors spec.md §4.6's "most-recently-modified log file"
/// fallback.
fn find_most_recent_session_log(cwd: &std::path::Path) -> Option<PathBuf> {
    std::fs::read_dir(cwd)
        .ok()?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().extension().and_then(std::ffi::OsStr::to_str) == Some("jsonl"))
        .max_by_key(|entry| entry.metadata().and_then(|m| m.modified()).ok())
        .map(|entry| entry.path())
}

/// Run one hook invocation. Per spec.md §6.2, hook failures must never
/// propagate as a nonzero exit: any error reading/parsing the payload or
/// archiving is logged via `tracing::error!` and reported back as plain
/// text instead.
fn run_hook(store: &SqliteStore, cfg: &EngineConfig, event: HookEvent) -> String {
    match run_hook_inner(store, cfg, event) {
        Ok(message) => message,
        Err(err) => {
            tracing::error!(error = %err, "hook invocation failed");
            format!("Hook error (ignored): {err}")
        }
    }
}

fn run_hook_inner(store: &SqliteStore, cfg: &EngineConfig, event: HookEvent) -> Result<String> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("reading hook payload from stdin")?;
    let payload: HookPayload = serde_json::from_str(&raw).context("parsing hook payload JSON")?;

    let trigger = match event {
        HookEvent::PreCompaction => ArchiveTrigger::PreCompaction,
        HookEvent::SessionEnd => ArchiveTrigger::SessionEnd,
    };
    let session_id = payload.session_id.unwrap_or_else(|| {
        payload
            .transcript_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown-session".to_string())
    });
    let archive_event = ArchiveEvent {
        session_path: payload.transcript_path,
        cwd: payload.cwd,
        session_id,
        trigger,
    };

    let (tag_oracle, summary_oracle, fact_oracle) = build_oracles(cfg);
    match archive_session(store, cfg, &tag_oracle, &summary_oracle, &fact_oracle, &archive_event)? {
        Some(outcome) => Ok(format!("Archived session as {}", outcome.summary_id)),
        None => Ok("Skipped (already archived or no transcript).".to_string()),
    }
}
