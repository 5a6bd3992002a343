//! MCP tool implementations, one module per tool.

pub mod capture_single_scan;
pub mod connect_sensor;
pub mod disconnect_sensor;
pub mod discover_sensors;
pub mod get_connected_sensors;
pub mod get_scan;
pub mod get_sensor_info;
pub mod process_point_cloud;
pub mod registry;
pub mod set_sensor_config;
pub mod stream_scans;

pub use registry::ToolRegistry;
