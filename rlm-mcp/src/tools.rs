//! Tool schema and dispatch for the six agent-facing memory tools.
//!
//! One tool per CLI verb named in spec.md §6.3: `recall`, `remember`,
//! `memory_list`, `memory_extract`, `remember_url`, `forget`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use rlm_core::constants;
use rlm_core::pipeline::{smart_remember, RememberRequest};
use rlm_core::query::{self, ExtractMode};
use rlm_core::store::Store;

use crate::error::{Error, Result};
use crate::McpContext;

/// A tool's static description, as surfaced by `tools/list`.
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// `tools/call` request params: a tool name plus its arguments object.
#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<Value>,
}

/// `tools/call` result: MCP's textual content block convention.
#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
}

impl CallToolResult {
    #[must_use]
    pub fn text(text: String) -> Self {
        Self { content: vec![Content::Text { text }] }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

/// The fixed tool list this server advertises.
#[must_use]
pub fn list() -> Vec<Tool> {
    vec![
        Tool {
            name: "recall",
            description: "Full-text search across stored episodes and facts, ranked by relevance.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}, "default": []},
                    "max": {"type": "integer", "default": 10},
                    "deep": {"type": "boolean", "default": false}
                },
                "required": ["query"]
            }),
        },
        Tool {
            name: "remember",
            description: "Store a piece of content, auto-tagged/summarized/fact-extracted.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}, "default": []},
                    "source_name": {"type": "string"},
                    "summary": {"type": "string"},
                    "dedup": {"type": "boolean", "default": true}
                },
                "required": ["content"]
            }),
        },
        Tool {
            name: "memory_list",
            description: "Paginated listing of stored episode metadata, optionally filtered by tags (intersection).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tags": {"type": "array", "items": {"type": "string"}, "default": []},
                    "limit": {"type": "integer", "default": 20},
                    "offset": {"type": "integer", "default": 0}
                }
            }),
        },
        Tool {
            name: "memory_extract",
            description: "Project a stored episode's content: full, one chunk, or a grep with context.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "entry_id": {"type": "string"},
                    "chunk_id": {"type": "string"},
                    "grep": {"type": "string"},
                    "context": {"type": "integer"}
                },
                "required": ["entry_id"]
            }),
        },
        Tool {
            name: "remember_url",
            description: "Fetch a URL and store its body the same way `remember` stores inline content.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}, "default": []},
                    "summary": {"type": "string"}
                },
                "required": ["url"]
            }),
        },
        Tool {
            name: "forget",
            description: "Delete one stored episode by id, cascading to its linked facts.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "entry_id": {"type": "string"}
                },
                "required": ["entry_id"]
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct RecallArgs {
    query: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_max")]
    max: usize,
    #[serde(default)]
    deep: bool,
}

fn default_max() -> usize {
    10
}

#[derive(Debug, Deserialize)]
struct RememberArgs {
    content: String,
    #[serde(default)]
    tags: Vec<String>,
    source_name: Option<String>,
    summary: Option<String>,
    #[serde(default = "default_true")]
    dedup: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct MemoryListArgs {
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
struct MemoryExtractArgs {
    entry_id: String,
    chunk_id: Option<String>,
    grep: Option<String>,
    context: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RememberUrlArgs {
    url: String,
    #[serde(default)]
    tags: Vec<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForgetArgs {
    entry_id: String,
}

/// Run one `tools/call`, dispatching by tool name.
///
/// # Errors
/// Returns [`Error::UnknownTool`] for a name outside [`list`], and
/// [`Error::InvalidParams`] when `arguments` doesn't match the tool's
/// schema. Engine failures surface as [`Error::Engine`].
pub fn call(ctx: &McpContext, params: CallToolParams) -> Result<CallToolResult> {
    let args = params.arguments.unwrap_or(Value::Null);
    match params.name.as_str() {
        "recall" => call_recall(ctx, args),
        "remember" => call_remember(ctx, args),
        "memory_list" => call_memory_list(ctx, args),
        "memory_extract" => call_memory_extract(ctx, args),
        "remember_url" => call_remember_url(ctx, args),
        "forget" => call_forget(ctx, args),
        other => Err(Error::UnknownTool(other.to_string())),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::InvalidParams(e.to_string()))
}

fn call_recall(ctx: &McpContext, args: Value) -> Result<CallToolResult> {
    let args: RecallArgs = parse_args(args)?;
    let text = query::recall(ctx.store.as_ref(), &args.query, &args.tags, args.max, args.deep)?;
    Ok(CallToolResult::text(text))
}

fn call_remember(ctx: &McpContext, args: Value) -> Result<CallToolResult> {
    let args: RememberArgs = parse_args(args)?;
    let outcome = smart_remember(
        ctx.store.as_ref(),
        &ctx.cfg,
        &ctx.tag_oracle,
        &ctx.summary_oracle,
        &ctx.fact_oracle,
        RememberRequest {
            content: args.content,
            source: "mcp".to_string(),
            source_name: args.source_name,
            user_tags: args.tags,
            label: args.summary,
            dedup: args.dedup,
        },
    )?;
    Ok(CallToolResult::text(format!(
        "Stored {} ({} tags, {} facts): {}",
        outcome.summary_id,
        outcome.tags.len(),
        outcome.facts_count,
        outcome.summary
    )))
}

fn call_memory_list(ctx: &McpContext, args: Value) -> Result<CallToolResult> {
    let args: MemoryListArgs = parse_args(args)?;
    let text = query::memory_list(ctx.store.as_ref(), &args.tags, args.limit, args.offset)?;
    Ok(CallToolResult::text(text))
}

fn call_memory_extract(ctx: &McpContext, args: Value) -> Result<CallToolResult> {
    let args: MemoryExtractArgs = parse_args(args)?;
    let mode = match (args.chunk_id, args.grep) {
        (Some(chunk_id), _) => ExtractMode::Chunk(chunk_id),
        (None, Some(pattern)) => {
            ExtractMode::Grep(pattern, args.context.unwrap_or(constants::DEFAULT_GREP_CONTEXT))
        }
        (None, None) => ExtractMode::Full,
    };
    let text = query::memory_extract(ctx.store.as_ref(), &args.entry_id, mode)?;
    Ok(CallToolResult::text(text))
}

fn call_remember_url(ctx: &McpContext, args: Value) -> Result<CallToolResult> {
    let args: RememberUrlArgs = parse_args(args)?;
    let body = reqwest_get(&args.url)?;
    let outcome = smart_remember(
        ctx.store.as_ref(),
        &ctx.cfg,
        &ctx.tag_oracle,
        &ctx.summary_oracle,
        &ctx.fact_oracle,
        RememberRequest {
            content: body,
            source: "url".to_string(),
            source_name: Some(args.url),
            user_tags: args.tags,
            label: args.summary,
            dedup: true,
        },
    )?;
    Ok(CallToolResult::text(format!(
        "Stored {} ({} tags, {} facts): {}",
        outcome.summary_id,
        outcome.tags.len(),
        outcome.facts_count,
        outcome.summary
    )))
}

fn call_forget(ctx: &McpContext, args: Value) -> Result<CallToolResult> {
    let args: ForgetArgs = parse_args(args)?;
    let deleted = ctx.store.delete_entry(&args.entry_id)?;
    let text = if deleted {
        format!("Deleted {}", args.entry_id)
    } else {
        format!("No entry found with id {}", args.entry_id)
    };
    Ok(CallToolResult::text(text))
}

/// Thin wrapper so `remember_url`'s fetch failure reports as an engine
/// error rather than a bare `reqwest` one, matching how `rlm-cli` reports
/// it via `anyhow::Context`.
fn reqwest_get(url: &str) -> Result<String> {
    reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::text)
        .map_err(|e| Error::InvalidParams(format!("fetching {url}: {e}")))
}
