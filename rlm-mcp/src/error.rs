//! Error type for the MCP tool surface.

use thiserror::Error;

/// Errors raised while servicing a JSON-RPC request.
#[derive(Debug, Error)]
pub enum Error {
    /// The request named an unknown tool.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// `params` was missing or didn't match the tool's expected shape.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The underlying engine call failed.
    #[error("tool execution failed: {0}")]
    Engine(#[from] rlm_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The JSON-RPC error code this error should be reported under.
    #[must_use]
    pub fn rpc_code(&self) -> i32 {
        match self {
            Error::UnknownTool(_) => crate::jsonrpc::METHOD_NOT_FOUND,
            Error::InvalidParams(_) => crate::jsonrpc::INVALID_PARAMS,
            Error::Engine(_) | Error::Io(_) | Error::Serialization(_) => {
                crate::jsonrpc::INTERNAL_ERROR
            }
        }
    }
}
