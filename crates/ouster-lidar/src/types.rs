//! Core data types for sensor connections, scans, and configuration outcomes.

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Minimal identity of a sensor, cached when the connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorIdentity {
    pub serial: String,
    pub model: String,
    pub firmware_version: String,
}

/// Metadata reported by a connected sensor. Never cached; fetched per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMetadata {
    pub serial: String,
    pub model: String,
    pub firmware_version: String,
    pub lidar_mode: String,
    pub status: String,
    /// Azimuth window in millidegrees.
    pub azimuth_window: [u32; 2],
    pub beam_altitude_angles: Vec<f64>,
    pub beam_azimuth_angles: Vec<f64>,
    pub lidar_origin_to_beam_origin_mm: f64,
    pub pixels_per_column: usize,
    pub columns_per_frame: usize,
    pub udp_port_lidar: u16,
    pub udp_port_imu: u16,
}

impl SensorMetadata {
    pub fn identity(&self) -> SensorIdentity {
        SensorIdentity {
            serial: self.serial.clone(),
            model: self.model.clone(),
            firmware_version: self.firmware_version.clone(),
        }
    }
}

/// One complete rotation of measurements, shaped height (beams) x width (columns).
#[derive(Debug, Clone)]
pub struct LidarScan {
    pub frame_id: u64,
    /// Range in millimeters; zero marks a pixel without a return.
    pub range: Array2<u32>,
    pub signal: Array2<u16>,
    pub reflectivity: Array2<u16>,
    pub near_ir: Array2<u16>,
}

impl LidarScan {
    /// Create an all-zero scan of the given shape.
    pub fn new(frame_id: u64, height: usize, width: usize) -> Self {
        Self {
            frame_id,
            range: Array2::zeros((height, width)),
            signal: Array2::zeros((height, width)),
            reflectivity: Array2::zeros((height, width)),
            near_ir: Array2::zeros((height, width)),
        }
    }

    pub fn height(&self) -> usize {
        self.range.nrows()
    }

    pub fn width(&self) -> usize {
        self.range.ncols()
    }

    pub fn cell_count(&self) -> usize {
        self.range.len()
    }

    /// Number of pixels with a non-zero range.
    pub fn valid_returns(&self) -> usize {
        self.range.iter().filter(|&&r| r > 0).count()
    }
}

/// Scan dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanShape {
    pub h: usize,
    pub w: usize,
}

/// Min / max / mean of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Bounded-size description of one scan. Raw grids are never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub frame_id: u64,
    pub scan_shape: ScanShape,
    pub range_stats: ChannelStats,
    pub signal_stats: ChannelStats,
    pub reflectivity_stats: ChannelStats,
    pub num_valid_returns: usize,
}

/// Whole-grid statistics of one channel, zero pixels included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub shape: ScanShape,
    pub dtype: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub non_zero_count: usize,
}

/// Every channel of one scan, keyed by channel name (`RANGE`, `SIGNAL`,
/// `REFLECTIVITY`, `NEAR_IR`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFieldReport {
    pub frame_id: u64,
    pub fields: BTreeMap<String, FieldSummary>,
}

/// A configuration key that was not applied, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedKey {
    pub key: String,
    pub reason: String,
}

/// Overall result of a multi-key configuration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    Success,
    Partial,
    Failed,
}

/// Per-key outcome of applying configuration. Sensor configuration is not
/// transactional, so keys succeed or fail independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOutcome {
    pub applied: Vec<String>,
    pub rejected: Vec<RejectedKey>,
}

impl ConfigOutcome {
    pub fn status(&self) -> ConfigStatus {
        match (self.applied.is_empty(), self.rejected.is_empty()) {
            (_, true) => ConfigStatus::Success,
            (false, false) => ConfigStatus::Partial,
            (true, false) => ConfigStatus::Failed,
        }
    }

    pub fn reject(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.rejected.push(RejectedKey {
            key: key.into(),
            reason: reason.into(),
        });
    }

    /// The partial-failure condition, if some keys were applied and others were not.
    pub fn partial_failure(&self) -> Option<LidarError> {
        match self.status() {
            ConfigStatus::Partial => Some(LidarError::PartialConfigFailure {
                applied: self.applied.len(),
                rejected: self.rejected.len(),
            }),
            _ => None,
        }
    }
}

/// Errors that can occur while talking to sensors or managing connections.
#[derive(thiserror::Error, Debug)]
pub enum LidarError {
    #[error("Sensor {0} is not connected")]
    NotConnected(String),

    #[error("Sensor {0} is already connected")]
    AlreadyConnected(String),

    #[error("Failed to connect to {hostname}: {reason}")]
    ConnectFailed { hostname: String, reason: String },

    #[error("Capture timeout: no complete scan from {hostname} within {timeout_ms} ms")]
    CaptureTimeout { hostname: String, timeout_ms: u64 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Configuration partially applied: {applied} key(s) applied, {rejected} rejected")]
    PartialConfigFailure { applied: usize, rejected: usize },

    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LidarError {
    /// Stable machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            LidarError::NotConnected(_) => "not_connected",
            LidarError::AlreadyConnected(_) => "already_connected",
            LidarError::ConnectFailed { .. } => "connect_failed",
            LidarError::CaptureTimeout { .. } => "capture_timeout",
            LidarError::InvalidConfig(_) => "invalid_config",
            LidarError::PartialConfigFailure { .. } => "partial_config_failure",
            LidarError::Sensor(_) => "sensor_error",
            LidarError::Unsupported(_) => "unsupported",
            LidarError::InvalidInput(_) => "invalid_input",
            LidarError::Discovery(_) => "discovery_failed",
            LidarError::Io(_) => "io_error",
        }
    }
}

/// Convenience result type.
pub type LidarResult<T> = Result<T, LidarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_status() {
        let mut outcome = ConfigOutcome::default();
        assert_eq!(outcome.status(), ConfigStatus::Success);

        outcome.reject("udp_dest", "bad address");
        assert_eq!(outcome.status(), ConfigStatus::Failed);
        assert!(outcome.partial_failure().is_none());

        outcome.applied.push("lidar_mode".to_string());
        assert_eq!(outcome.status(), ConfigStatus::Partial);
        assert!(matches!(
            outcome.partial_failure(),
            Some(LidarError::PartialConfigFailure {
                applied: 1,
                rejected: 1
            })
        ));
    }

    #[test]
    fn test_scan_valid_returns() {
        let mut scan = LidarScan::new(7, 2, 3);
        scan.range[[0, 0]] = 1500;
        scan.range[[1, 2]] = 20;
        assert_eq!(scan.height(), 2);
        assert_eq!(scan.width(), 3);
        assert_eq!(scan.cell_count(), 6);
        assert_eq!(scan.valid_returns(), 2);
    }

    #[test]
    fn test_error_kind_and_message() {
        let err = LidarError::NotConnected("os-1.local".to_string());
        assert_eq!(err.kind(), "not_connected");
        assert!(err.to_string().contains("os-1.local"));
    }
}
