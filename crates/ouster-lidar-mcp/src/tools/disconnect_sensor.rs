//! Tool: disconnect_sensor - Close a connection and forget the sensor.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::registry::{hostname_schema, parse_args, HostnameParams};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "disconnect_sensor".to_string(),
        description: Some("Disconnect from a connected sensor".to_string()),
        input_schema: hostname_schema(),
    }
}

pub async fn execute(args: Value, session: &Arc<LidarSession>) -> McpResult<ToolCallResult> {
    let params: HostnameParams = parse_args(args)?;

    match session.disconnect(&params.hostname).await {
        Ok(outcome) => {
            let mut body = json!({
                "status": "disconnected",
                "hostname": outcome.hostname
            });
            if let Some(warning) = outcome.warning {
                body["warning"] = json!(warning);
            }
            Ok(ToolCallResult::json(&body))
        }
        Err(e) => Ok(ToolCallResult::lidar_error(&e)),
    }
}
