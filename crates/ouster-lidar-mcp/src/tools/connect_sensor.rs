//! Tool: connect_sensor - Open a connection to a sensor.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::registry::{hostname_schema, parse_args, HostnameParams};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "connect_sensor".to_string(),
        description: Some(
            "Connect to an Ouster sensor by hostname or IP. Reconnecting to a connected sensor returns the existing connection".to_string(),
        ),
        input_schema: hostname_schema(),
    }
}

pub async fn execute(args: Value, session: &Arc<LidarSession>) -> McpResult<ToolCallResult> {
    let params: HostnameParams = parse_args(args)?;

    match session.connect(&params.hostname).await {
        Ok(outcome) => Ok(ToolCallResult::json(&json!({
            "status": outcome.status,
            "sensor_info": {
                "hostname": outcome.hostname,
                "serial": outcome.identity.serial,
                "model": outcome.identity.model,
                "firmware_version": outcome.identity.firmware_version
            }
        }))),
        Err(e) => Ok(ToolCallResult::lidar_error(&e)),
    }
}
