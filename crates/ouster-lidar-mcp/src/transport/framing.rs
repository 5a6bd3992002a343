//! Message framing for newline-delimited JSON.

use serde_json::Value;

use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

/// Parse a single line of text as a JSON-RPC message.
///
/// Text that is not JSON is a parse error; JSON that is not a JSON-RPC
/// message is an invalid request.
pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| McpError::InvalidRequest(e.to_string()))
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}

/// JSON-RPC error response for a message that could not be read.
pub fn unreadable_message_response(err: &McpError) -> Value {
    serde_json::to_value(err.to_json_rpc_error(RequestId::Null)).unwrap_or_default()
}
