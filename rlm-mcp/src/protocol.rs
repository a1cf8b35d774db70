//! MCP method handlers: `initialize`, `tools/list`, `tools/call`, `shutdown`.

use serde_json::json;

use crate::jsonrpc::{self, JsonRpcRequest, JsonRpcResponse};
use crate::tools::{self, CallToolParams};
use crate::McpContext;

/// Protocol version this server speaks. Single fixed version: unlike the
/// teacher's negotiated-version handling, this server has no prior
/// protocol revisions to stay compatible with.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Dispatch one parsed request to its handler. Returns `None` for
/// notifications (no `id`), which must not produce a response.
#[must_use]
pub fn handle(request: JsonRpcRequest, ctx: &McpContext) -> Option<JsonRpcResponse> {
    if request.id.is_none() {
        return None;
    }
    match request.method.as_str() {
        "initialize" => Some(handle_initialize(request)),
        "tools/list" => Some(handle_list_tools(request)),
        "tools/call" => Some(handle_call_tool(request, ctx)),
        "shutdown" => Some(JsonRpcResponse::ok(request.id, json!(null))),
        other => Some(JsonRpcResponse::err(
            request.id,
            jsonrpc::METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        )),
    }
}

fn handle_initialize(request: JsonRpcRequest) -> JsonRpcResponse {
    JsonRpcResponse::ok(
        request.id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": "rlm-mcp", "version": env!("CARGO_PKG_VERSION")}
        }),
    )
}

fn handle_list_tools(request: JsonRpcRequest) -> JsonRpcResponse {
    match serde_json::to_value(tools::list()) {
        Ok(tools) => JsonRpcResponse::ok(request.id, json!({ "tools": tools })),
        Err(e) => JsonRpcResponse::err(request.id, jsonrpc::INTERNAL_ERROR, e.to_string()),
    }
}

fn handle_call_tool(request: JsonRpcRequest, ctx: &McpContext) -> JsonRpcResponse {
    let Some(params) = request.params else {
        return JsonRpcResponse::err(request.id, jsonrpc::INVALID_PARAMS, "missing params");
    };
    let params: CallToolParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return JsonRpcResponse::err(request.id, jsonrpc::INVALID_PARAMS, e.to_string()),
    };

    match tools::call(ctx, params) {
        Ok(result) => match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::ok(request.id, value),
            Err(e) => JsonRpcResponse::err(request.id, jsonrpc::INTERNAL_ERROR, e.to_string()),
        },
        Err(err) => JsonRpcResponse::err(request.id, err.rpc_code(), err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn notification_without_id_yields_no_response() {
        let ctx = McpContext::for_test();
        let req = JsonRpcRequest { id: None, method: "initialize".to_string(), params: None };
        assert!(handle(req, &ctx).is_none());
    }

    #[test]
    fn initialize_reports_protocol_version() {
        let ctx = McpContext::for_test();
        let req = JsonRpcRequest { id: Some(json!(1)), method: "initialize".to_string(), params: None };
        let resp = handle(req, &ctx).unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], Value::String(PROTOCOL_VERSION.to_string()));
    }

    #[test]
    fn tools_list_returns_six_tools() {
        let ctx = McpContext::for_test();
        let req = JsonRpcRequest { id: Some(json!(2)), method: "tools/list".to_string(), params: None };
        let resp = handle(req, &ctx).unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["tools"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let ctx = McpContext::for_test();
        let req = JsonRpcRequest { id: Some(json!(3)), method: "bogus/method".to_string(), params: None };
        let resp = handle(req, &ctx).unwrap();
        assert_eq!(resp.error.unwrap().code, jsonrpc::METHOD_NOT_FOUND);
    }

    #[test]
    fn tools_call_round_trips_remember() {
        let ctx = McpContext::for_test();
        let req = JsonRpcRequest {
            id: Some(json!(4)),
            method: "tools/call".to_string(),
            params: Some(json!({"name": "remember", "arguments": {"content": "hello world"}})),
        };
        let resp = handle(req, &ctx).unwrap();
        assert!(resp.error.is_none());
        assert!(resp.result.is_some());
    }

    #[test]
    fn tools_call_unknown_tool_is_method_not_found() {
        let ctx = McpContext::for_test();
        let req = JsonRpcRequest {
            id: Some(json!(5)),
            method: "tools/call".to_string(),
            params: Some(json!({"name": "bogus"})),
        };
        let resp = handle(req, &ctx).unwrap();
        assert_eq!(resp.error.unwrap().code, jsonrpc::METHOD_NOT_FOUND);
    }
}
