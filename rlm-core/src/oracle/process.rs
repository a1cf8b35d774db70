//! Subprocess-backed oracle primaries.
//!
//! Each oracle shells out to `oracle_command` (typically `claude -p`),
//! feeding it a capability-specific prompt plus truncated input on
//! stdin and parsing its stdout. Grounded in `rlm/semantic_tags.py`,
//! `rlm/summarize.py`, and `rlm/facts.py`'s `_extract_via_llm`-style
//! subprocess invocation.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use super::{oracle_unreachable, truncate_for_oracle, FactOracle, SummaryOracle, TagOracle};
use crate::constants;
use crate::error::Result;
use crate::types::RawFact;

const TAG_PROMPT: &str = "Extract up to 10 concise topical tags (lowercase, hyphenated) for the \
following conversation excerpt. Reply with ONLY a comma-separated list, nothing else.\n\n";

const SUMMARY_PROMPT: &str = "Summarize this conversation excerpt as markdown with exactly these \
section headings, in order: '## Session Summary', '## Key Decisions', '## Problems Solved', \
'## Files Modified', '## Open Items'. Keep the whole reply between 2KB and 5KB. Reply with ONLY \
the markdown, nothing else.\n\n";

const FACT_PROMPT: &str = "Extract atomic facts from this conversation excerpt as a JSON array of \
objects with fields: fact_text, entity, fact_type (one of decision, preference, relationship, \
technical, observation), confidence (0.0-1.0). Reply with ONLY the JSON array, nothing else.\n\n";

fn invoke(command: &str, prompt: &str, input: &str, timeout: Duration) -> Result<String> {
    let mut child = Command::new(command)
        .arg("-p")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| oracle_unreachable(format!("failed to spawn {command}: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        let payload = format!("{prompt}{input}");
        stdin
            .write_all(payload.as_bytes())
            .map_err(|e| oracle_unreachable(format!("failed to write oracle stdin: {e}")))?;
    }

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(child.wait_with_output());
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) if output.status.success() => String::from_utf8(output.stdout)
            .map_err(|e| oracle_unreachable(format!("oracle produced non-utf8 output: {e}"))),
        Ok(Ok(output)) => Err(oracle_unreachable(format!(
            "oracle exited with status {}",
            output.status
        ))),
        Ok(Err(e)) => Err(oracle_unreachable(format!("oracle process error: {e}"))),
        Err(_) => Err(oracle_unreachable("oracle call timed out")),
    }
}

/// Subprocess-backed tag extraction.
pub struct ProcessTagOracle {
    pub command: String,
    pub timeout: Duration,
}

impl TagOracle for ProcessTagOracle {
    fn extract_tags(&self, text: &str) -> Result<Vec<String>> {
        let truncated = truncate_for_oracle(text, constants::ORACLE_INPUT_BUDGET);
        let raw = invoke(&self.command, TAG_PROMPT, &truncated, self.timeout)?;
        let cleaned = strip_markdown_fence(raw.trim());
        let tags: Vec<String> = cleaned
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .take(constants::MAX_AUTO_TAGS)
            .collect();
        if tags.is_empty() {
            Err(oracle_unreachable("oracle returned no tags"))
        } else {
            Ok(tags)
        }
    }
}

/// Subprocess-backed summary generation.
pub struct ProcessSummaryOracle {
    pub command: String,
    pub timeout: Duration,
}

impl SummaryOracle for ProcessSummaryOracle {
    fn summarize(&self, text: &str) -> Result<String> {
        let truncated = truncate_for_oracle(text, constants::ORACLE_INPUT_BUDGET);
        let raw = invoke(&self.command, SUMMARY_PROMPT, &truncated, self.timeout)?;
        let summary = strip_markdown_fence(raw.trim()).to_string();
        if summary.is_empty() {
            Err(oracle_unreachable("oracle returned an empty summary"))
        } else {
            Ok(summary)
        }
    }
}

/// Subprocess-backed fact extraction.
pub struct ProcessFactOracle {
    pub command: String,
    pub timeout: Duration,
}

impl FactOracle for ProcessFactOracle {
    fn extract_facts(&self, text: &str) -> Result<Vec<RawFact>> {
        let truncated = truncate_for_oracle(text, constants::ORACLE_INPUT_BUDGET);
        let raw = invoke(&self.command, FACT_PROMPT, &truncated, self.timeout)?;
        let cleaned = strip_markdown_fence(raw.trim());
        serde_json::from_str::<Vec<RawFact>>(cleaned)
            .map_err(|e| oracle_unreachable(format!("oracle returned unparseable facts JSON: {e}")))
    }
}

fn strip_markdown_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markdown_fence_removes_json_fence() {
        assert_eq!(strip_markdown_fence("```json\n[1,2]\n```"), "[1,2]");
    }

    #[test]
    fn strip_markdown_fence_leaves_plain_text_alone() {
        assert_eq!(strip_markdown_fence("foo, bar"), "foo, bar");
    }

    #[test]
    fn invoke_reports_oracle_unreachable_for_missing_binary() {
        let result = invoke(
            "definitely-not-a-real-oracle-binary",
            "prompt",
            "input",
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }
}
