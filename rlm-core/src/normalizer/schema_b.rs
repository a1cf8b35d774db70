//! Schema B parser: the generic `type=session` / `type=message` transcript
//! shape (spec.md §4.2). No reference implementation of this format was
//! retrieved; it's authored from the spec's description directly,
//! following Schema A's parsing conventions (skip unknown types and
//! malformed lines, build the same [`RawEvent`] stream).
//!
//! A `type: "session"` record carries session-level metadata and is
//! skipped by the parser (it has no role or text of its own). Each
//! `type: "message"` record has a `role` and a `blocks` array; each block
//! is one of `text`, `toolCall`, or `thinking`. `thinking` blocks are
//! internal reasoning and never surface in the normalized transcript.

use serde_json::Value;

use super::{summarize_tool_call, Role, ToolCallSummary};
use crate::normalizer::RawEvent;

pub fn parse(raw: &str) -> Vec<RawEvent> {
    let mut events = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(type_field) = value.get("type").and_then(Value::as_str) else {
            continue;
        };
        if type_field != "message" {
            continue;
        }
        let Some(role) = value.get("role").and_then(Value::as_str).and_then(to_role) else {
            continue;
        };
        let timestamp = value.get("timestamp").and_then(Value::as_f64);
        let (text, tool_calls) = match value.get("blocks") {
            Some(Value::Array(blocks)) => extract_from_blocks(blocks),
            _ => (
                value
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                Vec::new(),
            ),
        };
        events.push(RawEvent {
            role,
            timestamp,
            text,
            tool_calls,
        });
    }
    events
}

fn to_role(raw: &str) -> Option<Role> {
    match raw {
        "user" => Some(Role::User),
        "assistant" => Some(Role::Assistant),
        _ => None,
    }
}

fn extract_from_blocks(blocks: &[Value]) -> (String, Vec<ToolCallSummary>) {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(t) = block.get("text").and_then(Value::as_str) {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(t);
                }
            }
            Some("toolCall") => {
                let name = block.get("tool").and_then(Value::as_str).unwrap_or("tool");
                let input = block.get("args").cloned().unwrap_or(Value::Null);
                tool_calls.push(summarize_tool_call(name, &input));
            }
            _ => {}
        }
    }
    (text, tool_calls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_tool_call_blocks() {
        let raw = r#"{"type":"session","id":"s1"}
{"type":"message","role":"assistant","blocks":[{"type":"thinking","text":"internal"},{"type":"text","text":"done"},{"type":"toolCall","tool":"Read","args":{"file_path":"a.rs"}}]}"#;
        let events = parse(raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text, "done");
        assert_eq!(events[0].tool_calls[0].detail, "a.rs");
    }

    #[test]
    fn session_records_produce_no_events() {
        let raw = r#"{"type":"session","id":"s1"}"#;
        assert!(parse(raw).is_empty());
    }

    #[test]
    fn falls_back_to_plain_text_field_without_blocks() {
        let raw = r#"{"type":"message","role":"user","text":"hi there"}"#;
        let events = parse(raw);
        assert_eq!(events[0].text, "hi there");
    }
}
