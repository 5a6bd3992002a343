//! Tool: set_sensor_config - Apply configuration parameters key by key.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use ouster_lidar::{config_params, ConfigStatus};

use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::registry::parse_args;

#[derive(Debug, Deserialize)]
struct ConfigParams {
    hostname: String,
    config: Map<String, Value>,
}

pub fn definition() -> ToolDefinition {
    let keys: Vec<&str> = config_params::recognized_keys().collect();
    ToolDefinition {
        name: "set_sensor_config".to_string(),
        description: Some(
            "Set sensor configuration parameters. Each key is applied independently; unknown or invalid keys are reported as rejected while valid keys are still applied".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "hostname": {
                    "type": "string",
                    "description": "Sensor hostname or IP address"
                },
                "config": {
                    "type": "object",
                    "description": format!("Parameter name to value. Recognized keys: {}", keys.join(", ")),
                    "minProperties": 1
                }
            },
            "required": ["hostname", "config"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<LidarSession>) -> McpResult<ToolCallResult> {
    let params: ConfigParams = parse_args(args)?;

    let outcome = match session.configure(&params.hostname, &params.config).await {
        Ok(outcome) => outcome,
        Err(e) => return Ok(ToolCallResult::lidar_error(&e)),
    };

    let status = outcome.status();
    let mut body = json!({
        "status": status,
        "hostname": params.hostname,
        "applied": outcome.applied,
        "rejected": outcome.rejected
    });
    if let Some(partial) = outcome.partial_failure() {
        body["message"] = json!(partial.to_string());
    }

    let mut result = ToolCallResult::json(&body);
    if status == ConfigStatus::Failed {
        result.is_error = Some(true);
    }
    Ok(result)
}
