//! Tool: get_sensor_info - Live metadata of a connected sensor.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::registry::{hostname_schema, parse_args, HostnameParams};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_sensor_info".to_string(),
        description: Some(
            "Fetch current metadata from a connected sensor: identity, lidar mode, status, beam intrinsics, and UDP ports".to_string(),
        ),
        input_schema: hostname_schema(),
    }
}

pub async fn execute(args: Value, session: &Arc<LidarSession>) -> McpResult<ToolCallResult> {
    let params: HostnameParams = parse_args(args)?;

    let metadata = match session.sensor_info(&params.hostname).await {
        Ok(metadata) => metadata,
        Err(e) => return Ok(ToolCallResult::lidar_error(&e)),
    };

    let mut info = serde_json::to_value(&metadata)?;
    info["hostname"] = json!(params.hostname);

    Ok(ToolCallResult::json(&json!({
        "status": "success",
        "sensor_info": info
    })))
}
