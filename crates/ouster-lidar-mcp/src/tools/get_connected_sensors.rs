//! Tool: get_connected_sensors - List current connections.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_connected_sensors".to_string(),
        description: Some("List connected sensors in connection order".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub async fn execute(_args: Value, session: &Arc<LidarSession>) -> McpResult<ToolCallResult> {
    let connected = session.connected();

    let sensors: Vec<&str> = connected.iter().map(|c| c.identifier.as_str()).collect();
    let details: Vec<Value> = connected
        .iter()
        .map(|c| {
            json!({
                "hostname": c.identifier,
                "serial": c.identity.serial,
                "model": c.identity.model,
                "connected_at": c.connected_at.to_rfc3339()
            })
        })
        .collect();

    Ok(ToolCallResult::json(&json!({
        "status": "success",
        "count": sensors.len(),
        "sensors": sensors,
        "connected_sensors": details
    })))
}
