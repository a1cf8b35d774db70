//! JSON-RPC 2.0 request/response envelopes and stdio framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, Read, Write};

/// An inbound JSON-RPC request. `id` is `None` for notifications, which
/// must not produce a response.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

/// An outbound JSON-RPC response. Exactly one of `result`/`error` is set.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn ok(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    #[must_use]
    pub fn err(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard JSON-RPC error codes used by this server.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_PARAMS: i32 = -32602;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INTERNAL_ERROR: i32 = -32603;

/// Read one message, supporting both line-delimited JSON and LSP-style
/// `Content-Length` framing. Returns `(body, was_lsp_framed)` so the
/// caller can reply using the same framing the client used, or `None` on
/// EOF.
pub fn read_next_message<R: BufRead + Read>(reader: &mut R) -> io::Result<Option<(String, bool)>> {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('{') {
            return Ok(Some((trimmed.to_string(), false)));
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("content-length:") {
            let len: usize = trimmed
                .splitn(2, ':')
                .nth(1)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0);

            loop {
                let mut header_line = String::new();
                let header_n = reader.read_line(&mut header_line)?;
                if header_n == 0 || header_line.trim().is_empty() {
                    break;
                }
            }

            if len == 0 {
                continue;
            }
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            return Ok(Some((String::from_utf8_lossy(&buf).to_string(), true)));
        }

        // Ignore stray lines (e.g. a misbehaving dependency logging to stdout).
    }
}

/// Write a response framed with `Content-Length`, for LSP-style clients.
pub fn write_framed<W: Write>(writer: &mut W, body: &str) -> io::Result<()> {
    let bytes = body.as_bytes();
    let header = format!("Content-Length: {}\r\n\r\n", bytes.len());
    writer.write_all(header.as_bytes())?;
    writer.write_all(bytes)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Write a response as a single newline-terminated JSON line.
pub fn write_line<W: Write>(writer: &mut W, body: &str) -> io::Result<()> {
    writeln!(writer, "{body}")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_line_delimited_json() {
        let mut cursor = Cursor::new(b"{\"jsonrpc\":\"2.0\"}\n".to_vec());
        let (body, is_lsp) = read_next_message(&mut cursor).unwrap().unwrap();
        assert_eq!(body, "{\"jsonrpc\":\"2.0\"}");
        assert!(!is_lsp);
    }

    #[test]
    fn reads_content_length_framed_message() {
        let payload = "{\"jsonrpc\":\"2.0\"}";
        let framed = format!("Content-Length: {}\r\n\r\n{}", payload.len(), payload);
        let mut cursor = Cursor::new(framed.into_bytes());
        let (body, is_lsp) = read_next_message(&mut cursor).unwrap().unwrap();
        assert_eq!(body, payload);
        assert!(is_lsp);
    }

    #[test]
    fn returns_none_at_eof() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_next_message(&mut cursor).unwrap().is_none());
    }
}
