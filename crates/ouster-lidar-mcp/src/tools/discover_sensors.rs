//! Tool: discover_sensors - Find sensors on the local network.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "discover_sensors".to_string(),
        description: Some(
            "Search the local network for Ouster sensors; sensors already connected are marked as such".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub async fn execute(_args: Value, session: &Arc<LidarSession>) -> McpResult<ToolCallResult> {
    match session.discover().await {
        Ok(sensors) => Ok(ToolCallResult::json(&json!({
            "status": "success",
            "count": sensors.len(),
            "sensors": sensors
        }))),
        Err(e) => Ok(ToolCallResult::lidar_error(&e)),
    }
}
