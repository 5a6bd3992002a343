//! Ouster Lidar: sensor connections, a connection registry, and scan statistics.

pub mod config_params;
pub mod discovery;
pub mod ouster;
pub mod pointcloud;
pub mod registry;
pub mod sensor;
pub mod sim;
pub mod summary;
pub mod types;

pub use discovery::{parse_discovery_output, run_discovery, DiscoveredSensor};
pub use ouster::OusterHttpConnector;
pub use pointcloud::{analyze, PointCloudReport, XyzLut};
pub use registry::{ConnectionEntry, ConnectionRegistry, ConnectionSummary, SharedHandle};
pub use sensor::{SensorConnector, SensorHandle};
pub use sim::SimulatedConnector;
pub use summary::{field_report, summarize};
pub use types::*;
