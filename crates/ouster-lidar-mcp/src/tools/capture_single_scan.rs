//! Tool: capture_single_scan - One scan, reduced to summary statistics.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::registry::{hostname_schema, parse_args, HostnameParams};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "capture_single_scan".to_string(),
        description: Some(
            "Capture one complete scan and return its shape and range, signal, and reflectivity statistics over valid returns".to_string(),
        ),
        input_schema: hostname_schema(),
    }
}

pub async fn execute(args: Value, session: &Arc<LidarSession>) -> McpResult<ToolCallResult> {
    let params: HostnameParams = parse_args(args)?;

    match session.capture(&params.hostname).await {
        Ok(summary) => Ok(ToolCallResult::json(&json!({
            "status": "success",
            "scan_summary": summary
        }))),
        Err(e) => Ok(ToolCallResult::lidar_error(&e)),
    }
}
