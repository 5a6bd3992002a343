//! Tool: stream_scans - Capture consecutive scans.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::Progress;
use crate::session::manager::MAX_STREAM_SCANS;
use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::registry::parse_args;

#[derive(Debug, Deserialize)]
struct StreamParams {
    hostname: String,
    #[serde(default = "default_num_scans")]
    num_scans: usize,
}

fn default_num_scans() -> usize {
    10
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "stream_scans".to_string(),
        description: Some(
            "Capture several consecutive scans and return per-frame valid return counts and mean range".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "hostname": { "type": "string", "description": "Sensor hostname or IP address" },
                "num_scans": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_STREAM_SCANS,
                    "default": 10
                }
            },
            "required": ["hostname"]
        }),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<LidarSession>,
    progress: &Progress,
) -> McpResult<ToolCallResult> {
    let params: StreamParams = parse_args(args)?;

    let outcome = match session
        .stream_with_progress(&params.hostname, params.num_scans, progress)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return Ok(ToolCallResult::lidar_error(&e)),
    };

    match outcome.error {
        None => Ok(ToolCallResult::json(&json!({
            "status": "success",
            "hostname": params.hostname,
            "scans_captured": outcome.frames.len(),
            "scans": outcome.frames
        }))),
        Some(e) => {
            let body = json!({
                "status": "error",
                "kind": e.kind(),
                "message": format!(
                    "{e} (captured {} of {} scans)",
                    outcome.frames.len(),
                    outcome.requested
                ),
                "scans_captured": outcome.frames.len(),
                "scans": outcome.frames
            });
            let mut result = ToolCallResult::json(&body);
            result.is_error = Some(true);
            Ok(result)
        }
    }
}
