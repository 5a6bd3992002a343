//! Resources: ouster://sensors and ouster://sensor/{hostname}

use std::sync::Arc;

use serde_json::json;

use crate::session::LidarSession;
use crate::types::{McpResult, ReadResourceResult, ResourceContent};

use super::registry::{SENSORS_URI, SENSOR_URI_PREFIX};

pub fn read_connected(session: &Arc<LidarSession>) -> ReadResourceResult {
    let sensors: Vec<_> = session
        .connected()
        .into_iter()
        .map(|c| {
            json!({
                "hostname": c.identifier,
                "serial": c.identity.serial,
                "model": c.identity.model,
                "firmware_version": c.identity.firmware_version,
                "connected_at": c.connected_at.to_rfc3339(),
                "uri": format!("{SENSOR_URI_PREFIX}{}", c.identifier),
            })
        })
        .collect();

    let content = json!({
        "count": sensors.len(),
        "sensors": sensors,
    });

    ReadResourceResult {
        contents: vec![ResourceContent::json(SENSORS_URI, &content)],
    }
}

pub async fn read_sensor(hostname: &str, session: &Arc<LidarSession>) -> McpResult<ReadResourceResult> {
    let metadata = session.sensor_info(hostname).await?;

    Ok(ReadResourceResult {
        contents: vec![ResourceContent::json(
            format!("{SENSOR_URI_PREFIX}{hostname}"),
            &metadata,
        )],
    })
}
