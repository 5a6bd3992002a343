//! Tool: get_scan - Per-channel statistics of one scan.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::protocol::Progress;
use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::registry::{hostname_schema, parse_args, HostnameParams};

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_scan".to_string(),
        description: Some(
            "Capture one scan and report shape, dtype, min, max, mean, and non-zero count of the RANGE, SIGNAL, REFLECTIVITY, and NEAR_IR channels over the full grid".to_string(),
        ),
        input_schema: hostname_schema(),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<LidarSession>,
    progress: &Progress,
) -> McpResult<ToolCallResult> {
    let params: HostnameParams = parse_args(args)?;

    match session.scan_fields(&params.hostname, progress).await {
        Ok(report) => Ok(ToolCallResult::json(&json!({
            "status": "success",
            "hostname": params.hostname,
            "scan_data": report
        }))),
        Err(e) => Ok(ToolCallResult::lidar_error(&e)),
    }
}
