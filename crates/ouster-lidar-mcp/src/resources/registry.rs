//! Resource registration and dispatch.

use std::sync::Arc;

use crate::session::LidarSession;
use crate::types::{
    McpError, McpResult, ReadResourceResult, ResourceDefinition, ResourceTemplateDefinition,
};

use super::sensors;

pub const SENSORS_URI: &str = "ouster://sensors";
pub const SENSOR_URI_PREFIX: &str = "ouster://sensor/";

pub struct ResourceRegistry;

impl ResourceRegistry {
    pub fn list_templates() -> Vec<ResourceTemplateDefinition> {
        vec![ResourceTemplateDefinition {
            uri_template: format!("{SENSOR_URI_PREFIX}{{hostname}}"),
            name: "Sensor Metadata".to_string(),
            description: Some("Live metadata of one connected sensor".to_string()),
            mime_type: Some("application/json".to_string()),
        }]
    }

    pub fn list_resources() -> Vec<ResourceDefinition> {
        vec![ResourceDefinition {
            uri: SENSORS_URI.to_string(),
            name: "Connected Sensors".to_string(),
            description: Some("Sensors currently connected to this server".to_string()),
            mime_type: Some("application/json".to_string()),
        }]
    }

    pub async fn read(uri: &str, session: &Arc<LidarSession>) -> McpResult<ReadResourceResult> {
        if uri == SENSORS_URI {
            Ok(sensors::read_connected(session))
        } else if let Some(hostname) = uri.strip_prefix(SENSOR_URI_PREFIX) {
            if hostname.is_empty() {
                return Err(McpError::InvalidParams(format!(
                    "Sensor URI must be {SENSOR_URI_PREFIX}{{hostname}}"
                )));
            }
            sensors::read_sensor(hostname, session).await
        } else {
            Err(McpError::ResourceNotFound(uri.to_string()))
        }
    }
}
