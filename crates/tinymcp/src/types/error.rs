//! Error types and JSON-RPC error codes for the MCP server.

use serde_json::Value;

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    /// The payload is not valid JSON. Carries the decoder's message.
    #[error("Parse error")]
    ParseError(String),

    /// The payload is JSON but not a valid JSON-RPC 2.0 message.
    #[error("Invalid Request")]
    InvalidRequest(String),

    #[error("Method not found: '{0}'")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: '{0}'")]
    ToolNotFound(String),

    #[error("Resource not found: '{0}'")]
    ResourceNotFound(String),

    #[error("Prompt not found: '{0}'")]
    PromptNotFound(String),

    /// Two capabilities registered under the same key.
    #[error("{kind} already registered: '{name}'")]
    DuplicateRegistration { kind: &'static str, name: String },

    /// A resource URI template that cannot be compiled.
    #[error("Invalid resource template '{uri}': {reason}")]
    InvalidTemplate { uri: String, reason: String },

    /// A startup or shutdown hook failed.
    #[error("Lifecycle hook failed: {0}")]
    Hook(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        match self {
            McpError::ParseError(_) | McpError::Json(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_)
            | McpError::ToolNotFound(_)
            | McpError::ResourceNotFound(_)
            | McpError::PromptNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_)
            | McpError::DuplicateRegistration { .. }
            | McpError::InvalidTemplate { .. }
            | McpError::Hook(_)
            | McpError::Transport(_)
            | McpError::Io(_) => INTERNAL_ERROR,
        }
    }

    /// Extra detail carried in the error object's `data` member.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::ParseError(detail) | McpError::InvalidRequest(detail) => {
                Some(Value::String(detail.clone()))
            }
            _ => None,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: self.data(),
            },
        }
    }

    /// Wrap a handler failure, keeping the full cause chain in the message.
    pub fn internal(err: &anyhow::Error) -> Self {
        McpError::InternalError(format!("{err:#}"))
    }
}

pub type McpResult<T> = Result<T, McpError>;
