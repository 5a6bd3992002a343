//! Error types and JSON-RPC error codes for the MCP server.

use ouster_lidar::LidarError;

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    pub const RESOURCE_NOT_FOUND: i32 = -32802;
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const PROMPT_NOT_FOUND: i32 = -32804;
    /// A sensor operation failed outside of a tool call (resource reads).
    pub const SENSOR_ERROR: i32 = -32850;

    /// Server: Unauthorized (missing or invalid bearer token).
    pub const UNAUTHORIZED: i32 = -32900;
    /// Server: unknown SSE session.
    pub const SESSION_NOT_FOUND: i32 = -32901;
}

/// Errors surfaced at the protocol level.
///
/// Sensor failures inside a tool call never reach this type; they are folded
/// into the tool result instead.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Sensor error: {0}")]
    Sensor(#[from] LidarError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::ResourceNotFound(_) => RESOURCE_NOT_FOUND,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::PromptNotFound(_) => PROMPT_NOT_FOUND,
            McpError::Sensor(_) => SENSOR_ERROR,
            McpError::Transport(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::Json(_) => PARSE_ERROR,
            McpError::Unauthorized => UNAUTHORIZED,
            McpError::SessionNotFound(_) => SESSION_NOT_FOUND,
        }
    }

    /// Structured detail attached to the JSON-RPC error object.
    fn data(&self) -> Option<serde_json::Value> {
        match self {
            McpError::Sensor(e) => Some(serde_json::json!({ "kind": e.kind() })),
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
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(McpError::InvalidParams("x".into()).code(), -32602);
        assert_eq!(McpError::ToolNotFound("x".into()).code(), -32803);
        assert_eq!(McpError::MethodNotFound("x".into()).code(), -32601);
    }

    #[test]
    fn test_sensor_error_carries_kind() {
        let err: McpError = LidarError::NotConnected("os-1.local".into()).into();
        let rpc = err.to_json_rpc_error(RequestId::Number(1));
        assert_eq!(rpc.error.code, mcp_error_codes::SENSOR_ERROR);
        assert_eq!(rpc.error.data.unwrap()["kind"], "not_connected");
        assert!(rpc.error.message.contains("os-1.local"));
    }
}
