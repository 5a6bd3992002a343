//! Tool: process_point_cloud - Project one scan to XYZ and describe the scene.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use ouster_lidar::pointcloud::GRID_RESOLUTION;

use crate::session::LidarSession;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::registry::parse_args;

#[derive(Debug, Deserialize)]
struct PointCloudParams {
    hostname: String,
    #[serde(default)]
    max_distance: Option<f64>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "process_point_cloud".to_string(),
        description: Some(format!(
            "Capture a scan, convert it to a point cloud, and report its bounding box, {GRID_RESOLUTION} m occupancy grid, height distribution, and signal statistics"
        )),
        input_schema: json!({
            "type": "object",
            "properties": {
                "hostname": { "type": "string", "description": "Sensor hostname or IP address" },
                "max_distance": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "Ignore points farther than this many meters"
                }
            },
            "required": ["hostname"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<LidarSession>) -> McpResult<ToolCallResult> {
    let params: PointCloudParams = parse_args(args)?;

    let report = match session.point_cloud(&params.hostname, params.max_distance).await {
        Ok(report) => report,
        Err(e) => return Ok(ToolCallResult::lidar_error(&e)),
    };

    let body = match &report.detail {
        Some(detail) => json!({
            "status": "success",
            "frame_id": report.frame_id,
            "point_cloud": {
                "total_points": report.total_points,
                "valid_points": report.valid_points,
                "bounding_box": detail.bounding_box,
                "grid_analysis": detail.grid_analysis,
                "height_statistics": detail.height_statistics,
                "signal_statistics": detail.signal_statistics,
                "reflectivity_statistics": detail.reflectivity_statistics
            }
        }),
        None => json!({
            "status": "warning",
            "message": "No valid points in scan",
            "frame_id": report.frame_id,
            "point_cloud": {
                "total_points": report.total_points,
                "valid_points": 0
            }
        }),
    };
    Ok(ToolCallResult::json(&body))
}
