//! Tool registration and dispatch.

use std::sync::Arc;

use serde_json::Value;

use crate::protocol::Progress;
use crate::session::LidarSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{
    capture_single_scan, connect_sensor, disconnect_sensor, discover_sensors,
    get_connected_sensors, get_scan, get_sensor_info, process_point_cloud, set_sensor_config,
    stream_scans,
};

/// Name to handler table. Names are the public contract.
pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            connect_sensor::definition(),
            disconnect_sensor::definition(),
            get_sensor_info::definition(),
            get_connected_sensors::definition(),
            capture_single_scan::definition(),
            get_scan::definition(),
            set_sensor_config::definition(),
            stream_scans::definition(),
            process_point_cloud::definition(),
            discover_sensors::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        session: &Arc<LidarSession>,
        progress: &Progress,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));
        tracing::debug!("Calling tool {name}");

        match name {
            "connect_sensor" => connect_sensor::execute(args, session).await,
            "disconnect_sensor" => disconnect_sensor::execute(args, session).await,
            "get_sensor_info" => get_sensor_info::execute(args, session).await,
            "get_connected_sensors" => get_connected_sensors::execute(args, session).await,
            "capture_single_scan" => capture_single_scan::execute(args, session).await,
            "get_scan" => get_scan::execute(args, session, progress).await,
            "set_sensor_config" => set_sensor_config::execute(args, session).await,
            "stream_scans" => stream_scans::execute(args, session, progress).await,
            "process_point_cloud" => process_point_cloud::execute(args, session).await,
            "discover_sensors" => discover_sensors::execute(args, session).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}

/// Arguments for tools that address a single sensor.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct HostnameParams {
    pub hostname: String,
}

pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> McpResult<T> {
    serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))
}

pub(crate) fn hostname_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "hostname": {
                "type": "string",
                "description": "Sensor hostname or IP address, exactly as used to connect"
            }
        },
        "required": ["hostname"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_are_unique() {
        let tools = ToolRegistry::list_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert!(names.contains(&"capture_single_scan"));
    }

    #[test]
    fn test_every_schema_is_an_object() {
        for tool in ToolRegistry::list_tools() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        }
    }
}
