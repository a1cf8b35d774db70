//! Schema A parser: Claude Code-style session logs.
//!
//! Grounded in `rlm/export.py::export_session`. Each line is a JSON
//! object with `type: "user" | "assistant"` (other types, and malformed
//! lines, are skipped) and a `message.content` field that is either a
//! plain string or a list of content blocks (`text`, `tool_use`,
//! `tool_result`, `thinking`, ...).

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
        let Some(type_field) = value.get("type").and_then(|v| v.as_str()) else {
            continue;
        };
        let role = match type_field {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => continue,
        };
        let timestamp = value.get("timestamp").and_then(Value::as_f64);
        let content = value
            .get("message")
            .and_then(|m| m.get("content"))
            .cloned()
            .unwrap_or(Value::Null);
        let (text, tool_calls) = extract_text_and_tools(&content);
        events.push(RawEvent {
            role,
            timestamp,
            text,
            tool_calls,
        });
    }
    events
}

/// Extract plain text and a list of summarized tool calls from a
/// `message.content` field, handling both the string and block-array
/// shapes.
fn extract_text_and_tools(content: &Value) -> (String, Vec<ToolCallSummary>) {
    match content {
        Value::String(s) => (s.clone(), Vec::new()),
        Value::Array(blocks) => {
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
                    Some("tool_use") => {
                        let name = block.get("name").and_then(Value::as_str).unwrap_or("tool");
                        let input = block.get("input").cloned().unwrap_or(Value::Null);
                        tool_calls.push(summarize_tool_call(name, &input));
                    }
                    _ => {}
                }
            }
            (text, tool_calls)
        }
        _ => (String::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_content() {
        let raw = r#"{"type":"user","message":{"content":"hello there"}}"#;
        let events = parse(raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].role, Role::User);
        assert_eq!(events[0].text, "hello there");
    }

    #[test]
    fn parses_block_content_with_tool_use() {
        let raw = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"checking"},{"type":"tool_use","name":"Bash","input":{"command":"ls -la"}}]}}"#;
        let events = parse(raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text, "checking");
        assert_eq!(events[0].tool_calls.len(), 1);
        assert_eq!(events[0].tool_calls[0].detail, "ls -la");
    }

    #[test]
    fn skips_non_user_assistant_and_malformed_lines() {
        let raw = "{\"type\":\"summary\"}\nnot json\n{\"type\":\"user\",\"message\":{\"content\":\"hi\"}}";
        let events = parse(raw);
        assert_eq!(events.len(), 1);
    }
}
