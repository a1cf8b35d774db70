//! `rlm-mcp`: stdio JSON-RPC entry point.

use std::io::{self, Write};

use rlm_mcp::jsonrpc::{
    read_next_message, write_framed, write_line, JsonRpcRequest, JsonRpcResponse, PARSE_ERROR,
};
use rlm_mcp::{protocol, McpContext};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let ctx = McpContext::from_env();
    run(&ctx)
}

fn run(ctx: &McpContext) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();

    loop {
        match read_next_message(&mut handle) {
            Ok(None) => {
                tracing::info!("stdin closed, shutting down");
                break;
            }
            Ok(Some((body, is_lsp))) => {
                let response = match serde_json::from_str::<JsonRpcRequest>(&body) {
                    Ok(request) => protocol::handle(request, ctx),
                    Err(e) => {
                        tracing::error!(error = %e, "failed to parse JSON-RPC request");
                        Some(JsonRpcResponse::err(None, PARSE_ERROR, e.to_string()))
                    }
                };
                if let Some(response) = response {
                    let rendered = serde_json::to_string(&response)?;
                    if is_lsp {
                        write_framed(&mut stdout, &rendered)?;
                    } else {
                        write_line(&mut stdout, &rendered)?;
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "error reading from stdin");
                break;
            }
        }
    }

    stdout.flush()?;
    Ok(())
}
