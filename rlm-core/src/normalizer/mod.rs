//! Transcript Normalizer (spec.md §4.2).
//!
//! Coding-agent session logs arrive in one of two JSONL shapes. Both are
//! parsed down into one common intermediate stream of [`RawEvent`]s, which
//! a single ordered sequence of compression passes then reduces to a
//! compact, human-readable transcript. Grounded in `rlm/export.py`
//! (Schema A, the Claude Code session-log shape) with Schema B (the
//! generic `type=session`/`type=message` shape described in spec.md §4.2)
//! authored fresh since no reference implementation of it was retrieved.

mod schema_a;
mod schema_b;

use crate::constants;

/// Speaking role of a transcript event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One tool invocation, reduced to a single-line summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallSummary {
    pub name: String,
    pub detail: String,
}

/// A parsed-but-not-yet-compressed transcript event, the common shape
/// both schema parsers converge on.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub role: Role,
    pub timestamp: Option<f64>,
    pub text: String,
    pub tool_calls: Vec<ToolCallSummary>,
}

/// Which schema a transcript file was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Claude Code-style `type: "user" | "assistant"` records with a
    /// `message.content` string-or-blocks field.
    A,
    /// Generic `type: "session" | "message"` records with `toolCall`/
    /// `thinking` blocks.
    B,
    /// No recognizable records; treated as an empty transcript.
    Unknown,
}

/// Inspect the first few well-formed JSON lines to decide which schema a
/// transcript file uses, without fully parsing it.
#[must_use]
pub fn detect_schema(raw: &str) -> SchemaKind {
    for line in raw.lines().take(20) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        let Some(type_field) = value.get("type").and_then(|v| v.as_str()) else {
            continue;
        };
        match type_field {
            "user" | "assistant" => return SchemaKind::A,
            "session" | "message" => return SchemaKind::B,
            _ => continue,
        }
    }
    SchemaKind::Unknown
}

/// Parse and fully compress a raw transcript file's contents into a
/// formatted, bounded transcript string.
///
/// Unreadable input (empty, or no recognizable schema) yields an empty
/// transcript rather than an error: normalization is a best-effort
/// preprocessing step, not a hard dependency for ingestion.
#[must_use]
pub fn normalize_transcript(raw: &str, source_label: &str) -> String {
    let events = match detect_schema(raw) {
        SchemaKind::A => schema_a::parse(raw),
        SchemaKind::B => schema_b::parse(raw),
        SchemaKind::Unknown => Vec::new(),
    };
    let compressed = compress(events);
    format_transcript(&compressed, source_label)
}

/// Run the full ordered sequence of compression passes (spec.md §4.2
/// steps 1-9).
fn compress(events: Vec<RawEvent>) -> Vec<RawEvent> {
    let events = events
        .into_iter()
        .filter_map(|e| strip_noise(e))
        .collect::<Vec<_>>();
    let events = dedup_consecutive_assistant(events);
    events
        .into_iter()
        .map(|e| match e.role {
            Role::User => compress_user_event(e),
            Role::Assistant => compress_assistant_event(e),
        })
        .filter(|e| !(e.text.trim().is_empty() && e.tool_calls.is_empty()))
        .collect()
}

/// Pass 1-2: strip `<system-reminder>` blocks and reject injected skill
/// prompts masquerading as user text. Returns `None` to drop an event
/// entirely (e.g. an assistant turn with no text and no tool calls).
fn strip_noise(mut event: RawEvent) -> Option<RawEvent> {
    event.text = strip_system_reminders(&event.text);
    if event.role == Role::User && is_skill_prompt(&event.text) {
        return None;
    }
    if event.role == Role::Assistant
        && event.text.trim().chars().count() < 3
        && event.tool_calls.is_empty()
    {
        return None;
    }
    Some(event)
}

fn strip_system_reminders(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        match rest.find("<system-reminder>") {
            Some(start) => {
                out.push_str(&rest[..start]);
                match rest[start..].find("</system-reminder>") {
                    Some(end_rel) => {
                        let end = start + end_rel + "</system-reminder>".len();
                        rest = &rest[end..];
                    }
                    None => {
                        rest = "";
                    }
                }
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}

/// A text block is an injected instructional prompt, not real user
/// content, when it's long and matches several indicator phrases at once.
fn is_skill_prompt(text: &str) -> bool {
    if text.chars().count() < 500 {
        return false;
    }
    let hits = constants::SKILL_PROMPT_INDICATORS
        .iter()
        .filter(|indicator| text.contains(*indicator))
        .count();
    hits >= 2
}

/// Pass 3: collapse consecutive assistant turns that are duplicates of a
/// streaming re-emission, keeping the longer one.
fn dedup_consecutive_assistant(events: Vec<RawEvent>) -> Vec<RawEvent> {
    let mut out: Vec<RawEvent> = Vec::with_capacity(events.len());
    for event in events {
        if event.role == Role::Assistant {
            if let Some(prev) = out.last() {
                if prev.role == Role::Assistant {
                    let prev_len = prev.text.chars().count();
                    let new_len = event.text.chars().count();
                    if new_len >= prev_len {
                        out.pop();
                    } else {
                        continue;
                    }
                }
            }
        }
        out.push(event);
    }
    out
}

/// User-turn passes: trivial-confirmation collapse, slash-command XML
/// unwrapping, and pasted terminal-output compression.
fn compress_user_event(mut event: RawEvent) -> RawEvent {
    event.text = strip_command_xml(&event.text);
    if is_trivial_confirmation(&event.text) {
        event.text = "[User confirmed]".to_string();
        return event;
    }
    event.text = compress_pasted_output(&event.text);
    event
}

/// Assistant-turn passes: boilerplate lead-in stripping and tool-call
/// summarization (either inline alongside remaining text, or as a
/// `[Ran N tools: ...]` line when the turn is tool-calls-only).
fn compress_assistant_event(mut event: RawEvent) -> RawEvent {
    event.text = strip_boilerplate(&event.text);
    if event.text.trim().is_empty() && !event.tool_calls.is_empty() {
        let names = event
            .tool_calls
            .iter()
            .map(|t| t.name.clone())
            .collect::<Vec<_>>()
            .join(", ");
        event.text = format!("[Ran {} tool{}: {}]", event.tool_calls.len(), if event.tool_calls.len() == 1 { "" } else { "s" }, names);
    } else if !event.tool_calls.is_empty() {
        for call in &event.tool_calls {
            event.text.push_str(&format!("\n[Tool: {}] {}", call.name, call.detail));
        }
    }
    event
}

fn strip_command_xml(text: &str) -> String {
    let Some(msg_start) = text.find("<command-message>") else {
        return text.to_string();
    };
    let name_start = text.find("<command-name>");
    let name_tag_end = name_start.and_then(|s| text[s..].find("</command-name>").map(|e| s + e));
    let Some(name_start) = name_start else {
        return text.to_string();
    };
    let Some(name_end) = name_tag_end else {
        return text.to_string();
    };
    let name = &text[name_start + "<command-name>".len()..name_end];
    let args = text
        .find("<command-args>")
        .and_then(|s| {
            text[s..]
                .find("</command-args>")
                .map(|e| text[s + "<command-args>".len()..s + e].trim().to_string())
        })
        .unwrap_or_default();
    let _ = msg_start;
    if args.is_empty() {
        name.trim().to_string()
    } else {
        format!("{} {}", name.trim(), args)
    }
}

fn is_trivial_confirmation(text: &str) -> bool {
    let normalized = text.trim().trim_end_matches(|c: char| c == '.' || c == '!').to_lowercase();
    if constants::TRIVIAL_CONFIRMATIONS.contains(&normalized.as_str()) {
        return true;
    }
    normalized.chars().count() < 20
        && constants::TRIVIAL_CONFIRMATIONS
            .iter()
            .any(|c| normalized.starts_with(c))
}

fn boilerplate_lead_in_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"(?i)^(let me|i'll|i will|sure|great|perfect|absolutely|of course|good question|great question|excellent|alright)\b[^.\n]*(check|look|help|take a look|examine|review|investigate|search|explore|read|see|find|get|start|do that|handle that)?[.\n]",
        )
        .expect("boilerplate lead-in regex is valid")
    })
}

fn strip_boilerplate(text: &str) -> String {
    let trimmed = text.trim_start();
    if let Some(mat) = boilerplate_lead_in_re().find(trimmed) {
        let after = trimmed[mat.end()..].trim_start();
        if !after.is_empty() {
            return after.to_string();
        }
    }
    text.to_string()
}

/// Pasted terminal output (command prompts, stack traces, test runners)
/// that's mostly noise collapses to a head/tail excerpt.
fn compress_pasted_output(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 10 {
        return text.to_string();
    }
    let terminal_like = lines
        .iter()
        .filter(|l| looks_like_terminal_output(l))
        .count();
    if (terminal_like as f64) / (lines.len() as f64) < 0.3 {
        return text.to_string();
    }
    let head = lines[..3].join("\n");
    let tail = lines[lines.len() - 3..].join("\n");
    format!(
        "{head}\n[...{} lines of terminal output...]\n{tail}",
        lines.len() - 6
    )
}

fn terminal_indicator_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r#"^[$>❯]|Traceback|[Ee]rror|warning|at .+:\d+|File "|npm ERR|FAILED|PASS|✓|✗|\d+ (passing|failing)"#,
        )
        .expect("terminal indicator regex is valid")
    })
}

fn looks_like_terminal_output(line: &str) -> bool {
    terminal_indicator_re().is_match(line.trim_start())
}

/// A per-tool one-line summary (spec.md §4.2, grounded in
/// `rlm/export.py::_summarize_tool_call`).
#[must_use]
pub fn summarize_tool_call(name: &str, input: &serde_json::Value) -> ToolCallSummary {
    let detail = match name {
        "Bash" => input
            .get("command")
            .and_then(|v| v.as_str())
            .map(|c| truncate_chars(c, 200))
            .unwrap_or_default(),
        "Read" | "Write" | "Edit" => input
            .get("file_path")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        "Task" => input
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        "Grep" | "Glob" => input
            .get("pattern")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        other => return ToolCallSummary { name: other.to_string(), detail: format!("[Tool: {other}]") },
    };
    ToolCallSummary { name: name.to_string(), detail }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{truncated}...")
    }
}

/// Render the fully compressed event stream into the formatted transcript
/// text passed into `smart_remember`.
fn format_transcript(events: &[RawEvent], source_label: &str) -> String {
    let mut out = format!("# Session Transcript ({} messages)\n", events.len());
    out.push_str(&format!("# Source: {source_label}\n\n"));
    for event in events {
        let role_label = match event.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        let time_label = event
            .timestamp
            .and_then(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        out.push_str(&format!("[{time_label}] {role_label}:\n{}\n\n", event.text.trim()));
    }
    out
}
