//! The boundary to the sensor: opening connections and driving an open handle.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{LidarResult, LidarScan, SensorMetadata};

/// One open session with a physical (or simulated) sensor.
///
/// Implementations are not assumed safe for concurrent use; callers serialize
/// access per handle. `close` may be called more than once and must not fail
/// on the second call.
#[async_trait]
pub trait SensorHandle: Send {
    /// Fetch the current metadata from the sensor.
    async fn metadata(&mut self) -> LidarResult<SensorMetadata>;

    /// Block until one complete scan is available.
    async fn read_scan(&mut self) -> LidarResult<LidarScan>;

    /// Apply a single configuration parameter.
    async fn set_config(&mut self, key: &str, value: &Value) -> LidarResult<()>;

    /// Release the connection.
    async fn close(&mut self) -> LidarResult<()>;
}

/// Opens sensor handles by hostname.
#[async_trait]
pub trait SensorConnector: Send + Sync {
    async fn connect(&self, hostname: &str) -> LidarResult<Box<dyn SensorHandle>>;
}
