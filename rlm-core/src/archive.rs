//! Archival Coordinator (spec.md §4.6): at-most-once archival of a coding
//! session's transcript into the store, driven by hook events
//! (pre-compaction and session-end).
//!
//! Grounded in `rlm/archive.py` and its accompanying hook scripts. The
//! at-most-once guarantee rests on two mechanisms: a watermark side-file
//! next to the transcript recording the timestamp and byte size last
//! archived (skip if the file hasn't grown since), and a recent-archive
//! guard (skip a session-end archive that follows a pre-compaction
//! archive of the same file within [`constants::RECENT_ARCHIVE_GUARD_SECS`]).

use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::constants;
use crate::error::Result;
use crate::normalizer;
use crate::oracle::{FactOracleSet, SummaryOracleSet, TagOracleSet};
use crate::pipeline::{smart_remember, RememberRequest};
use crate::store::Store;
use crate::types::{unix_timestamp, RememberOutcome};

/// Which hook fired the archival attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveTrigger {
    PreCompaction,
    SessionEnd,
}

/// Everything the archival coordinator needs about one session.
#[derive(Debug, Clone)]
pub struct ArchiveEvent {
    pub session_path: PathBuf,
    pub cwd: PathBuf,
    pub session_id: String,
    pub trigger: ArchiveTrigger,
}

/// Watermark recorded alongside an archived transcript file, as a
/// two-line sidecar: an ISO-8601 timestamp, then the file size in bytes.
#[derive(Debug, Clone, PartialEq)]
struct Watermark {
    archived_at: f64,
    file_size: u64,
}

impl Watermark {
    fn parse(raw: &str) -> Option<Self> {
        let mut lines = raw.lines();
        let ts_line = lines.next()?;
        let size_line = lines.next()?;
        let archived_at = chrono::DateTime::parse_from_rfc3339(ts_line.trim())
            .ok()?
            .timestamp() as f64;
        let file_size = size_line.trim().parse().ok()?;
        Some(Self { archived_at, file_size })
    }

    fn format(&self) -> String {
        let dt = chrono::DateTime::<chrono::Utc>::from_timestamp(self.archived_at as i64, 0)
            .unwrap_or_else(chrono::Utc::now);
        format!("{}\n{}\n", dt.to_rfc3339(), self.file_size)
    }
}

fn watermark_path(session_path: &Path) -> PathBuf {
    let mut os_string = session_path.as_os_str().to_os_string();
    os_string.push(".rlm-archived");
    PathBuf::from(os_string)
}

/// Archive one session's transcript, applying the at-most-once guards.
/// Returns `None` when the archive was skipped (no transcript, unchanged
/// since the last watermark, or within the recent-archive guard window).
///
/// # Errors
/// Propagates storage and filesystem errors. A missing or unreadable
/// transcript file is not an error: it yields `Ok(None)`, since hooks
/// fire unconditionally and a session with nothing to archive yet is
/// the common case.
#[allow(clippy::too_many_arguments)]
pub fn archive_session(
    store: &dyn Store,
    cfg: &EngineConfig,
    tag_oracle: &TagOracleSet,
    summary_oracle: &SummaryOracleSet,
    fact_oracle: &FactOracleSet,
    event: &ArchiveEvent,
) -> Result<Option<RememberOutcome>> {
    let Ok(metadata) = std::fs::metadata(&event.session_path) else {
        return Ok(None);
    };
    let file_size = metadata.len();

    let watermark_file = watermark_path(&event.session_path);
    if let Ok(existing_raw) = std::fs::read_to_string(&watermark_file) {
        if let Some(watermark) = Watermark::parse(&existing_raw) {
            if watermark.file_size == file_size {
                return Ok(None);
            }
            let now = unix_timestamp();
            if event.trigger == ArchiveTrigger::SessionEnd
                && (now - watermark.archived_at) < constants::RECENT_ARCHIVE_GUARD_SECS as f64
            {
                return Ok(None);
            }
        }
    }

    let Ok(raw_transcript) = std::fs::read_to_string(&event.session_path) else {
        return Ok(None);
    };

    let project_name = project_name_for(&event.cwd);
    let source_name = format!("session-{project_name}-{}", event.session_id);

    store.delete_entries_by_source_name(&source_name)?;

    let label = event
        .session_path
        .to_str()
        .unwrap_or("session transcript");
    let transcript = normalizer::normalize_transcript(&raw_transcript, label);

    let date = chrono::DateTime::<chrono::Utc>::from_timestamp(unix_timestamp() as i64, 0)
        .unwrap_or_else(chrono::Utc::now)
        .format("%Y-%m-%d")
        .to_string();

    let tags = vec![
        "conversation".to_string(),
        "session".to_string(),
        project_name.clone(),
        date.clone(),
        session_tag(&event.session_id),
    ];

    let outcome = smart_remember(
        store,
        cfg,
        tag_oracle,
        summary_oracle,
        fact_oracle,
        RememberRequest {
            content: transcript,
            source: "session".to_string(),
            source_name: Some(source_name),
            user_tags: tags,
            label: Some(format!("Session: {project_name} on {date}")),
            dedup: false,
        },
    )?;

    let watermark = Watermark {
        archived_at: unix_timestamp(),
        file_size,
    };
    let _ = std::fs::write(&watermark_file, watermark.format());

    Ok(Some(outcome))
}

/// Derive a project name from the nearest ancestor directory containing
/// a `.git` entry, falling back to the cwd's basename.
#[must_use]
pub fn project_name_for(cwd: &Path) -> String {
    find_git_root(cwd)
        .and_then(|root| root.file_name().map(|n| n.to_string_lossy().into_owned()))
        .or_else(|| cwd.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unknown-project".to_string())
}

/// Deterministic `s_` + 8 hex char tag for a session id, so repeated
/// archival of the same session (pre-compaction, then session-end)
/// tags both writes identically rather than minting a fresh token
/// each call.
fn session_tag(session_id: &str) -> String {
    let digest = format!("{:x}", md5::compute(session_id));
    format!("s_{}", &digest[..8])
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watermark_roundtrips_through_format_and_parse() {
        let wm = Watermark {
            archived_at: 1_700_000_000.0,
            file_size: 4096,
        };
        let formatted = wm.format();
        let parsed = Watermark::parse(&formatted).unwrap();
        assert_eq!(parsed.file_size, wm.file_size);
        assert!((parsed.archived_at - wm.archived_at).abs() < 1.0);
    }

    #[test]
    fn watermark_parse_rejects_malformed_input() {
        assert!(Watermark::parse("not a watermark").is_none());
    }

    #[test]
    fn project_name_falls_back_to_cwd_basename_without_git_root() {
        let dir = tempfile::tempdir().unwrap();
        let project = project_name_for(dir.path());
        assert_eq!(project, dir.path().file_name().unwrap().to_string_lossy());
    }

    #[test]
    fn project_name_uses_git_root_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("my-repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        let nested = repo.join("src").join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(project_name_for(&nested), "my-repo");
    }

    #[test]
    fn session_tag_is_deterministic_and_shaped() {
        let a = session_tag("abc-123");
        let b = session_tag("abc-123");
        assert_eq!(a, b);
        assert!(a.starts_with("s_"));
        assert_eq!(a.len(), 10);
    }

    #[test]
    fn missing_session_file_yields_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.jsonl");
        let meta = std::fs::metadata(&missing);
        assert!(meta.is_err());
    }
}
