//! Connection lifecycle and per-sensor operations.
//!
//! `LidarSession` is shared by every in-flight request. The registry lock is
//! only held for lookups; sensor I/O happens under the per-sensor handle lock,
//! so requests for different sensors run in parallel while requests for the
//! same sensor are serialized.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use ouster_lidar::{
    analyze, config_params, run_discovery, summarize, summary::field_report,
    summary::valid_range_mean, ConfigOutcome,
    ConnectionEntry, ConnectionRegistry, ConnectionSummary, DiscoveredSensor, LidarError,
    LidarResult, LidarScan, PointCloudReport, ScanFieldReport, ScanSummary, SensorConnector, SensorHandle,
    SensorIdentity, SensorMetadata, XyzLut,
};

use crate::config::ServerConfig;
use crate::protocol::Progress;

/// Upper bound for one `stream` request.
pub const MAX_STREAM_SCANS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectStatus {
    Connected,
    AlreadyConnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    pub status: ConnectStatus,
    pub hostname: String,
    pub identity: SensorIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub hostname: String,
    /// Set when the handle failed to close; the entry is removed regardless.
    pub warning: Option<String>,
}

/// Per-frame digest of a streamed scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamFrame {
    pub frame_id: u64,
    pub valid_returns: usize,
    pub range_mean: f64,
}

#[derive(Debug)]
pub struct StreamOutcome {
    pub requested: usize,
    pub frames: Vec<StreamFrame>,
    /// The failure that ended the stream early, if any.
    pub error: Option<LidarError>,
}

/// Shared state behind every tool call.
pub struct LidarSession {
    registry: Arc<ConnectionRegistry>,
    connector: Arc<dyn SensorConnector>,
    connect_timeout: Duration,
    capture_timeout: Duration,
    discovery_timeout: Duration,
    discover_command: String,
}

impl LidarSession {
    pub fn new(connector: Arc<dyn SensorConnector>, config: &ServerConfig) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            connector,
            connect_timeout: config.connect_timeout,
            capture_timeout: config.capture_timeout,
            discovery_timeout: config.discovery_timeout,
            discover_command: config.discover_command.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Open a connection, or report the one already registered under `hostname`.
    pub async fn connect(&self, hostname: &str) -> LidarResult<ConnectOutcome> {
        if hostname.trim().is_empty() {
            return Err(LidarError::InvalidInput("hostname must not be empty".to_string()));
        }

        if let Ok(existing) = self.registry.summary(hostname) {
            tracing::debug!("Sensor {hostname} already connected");
            return Ok(already_connected(existing));
        }

        tracing::info!("Connecting to sensor {hostname}");
        let opened = tokio::time::timeout(self.connect_timeout, self.open(hostname))
            .await
            .map_err(|_| LidarError::ConnectFailed {
                hostname: hostname.to_string(),
                reason: format!(
                    "connection timeout after {:.1} s",
                    self.connect_timeout.as_secs_f64()
                ),
            })??;
        let (handle, metadata) = opened;

        let identity = metadata.identity();
        match self
            .registry
            .register(ConnectionEntry::new(hostname, identity.clone(), handle))
        {
            Ok(()) => {
                tracing::info!(
                    "Connected to {hostname}: {} (serial {}, firmware {})",
                    identity.model,
                    identity.serial,
                    identity.firmware_version
                );
                Ok(ConnectOutcome {
                    status: ConnectStatus::Connected,
                    hostname: hostname.to_string(),
                    identity,
                })
            }
            Err(conflict) => {
                // Lost a race with a concurrent connect; keep the winner.
                let handle = conflict.entry.handle();
                if let Err(e) = handle.lock().await.close().await {
                    tracing::warn!("Failed to close duplicate handle for {hostname}: {e}");
                }
                let existing = self.registry.summary(hostname)?;
                Ok(already_connected(existing))
            }
        }
    }

    async fn open(&self, hostname: &str) -> LidarResult<(Box<dyn SensorHandle>, SensorMetadata)> {
        let mut handle = self.connector.connect(hostname).await?;
        match handle.metadata().await {
            Ok(metadata) => Ok((handle, metadata)),
            Err(e) => {
                if let Err(close_err) = handle.close().await {
                    tracing::warn!("Failed to close {hostname} after metadata error: {close_err}");
                }
                Err(match e {
                    LidarError::Sensor(reason) => LidarError::ConnectFailed {
                        hostname: hostname.to_string(),
                        reason,
                    },
                    other => other,
                })
            }
        }
    }

    /// Remove a sensor and release its handle once in-flight work on it finishes.
    pub async fn disconnect(&self, hostname: &str) -> LidarResult<DisconnectOutcome> {
        let entry = self.registry.unregister(hostname)?;
        let handle = entry.handle();
        let warning = match handle.lock().await.close().await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Error closing {hostname}: {e}");
                Some(format!("sensor removed but close failed: {e}"))
            }
        };
        tracing::info!("Disconnected from sensor {hostname}");
        Ok(DisconnectOutcome {
            hostname: hostname.to_string(),
            warning,
        })
    }

    /// Fresh metadata from the sensor.
    pub async fn sensor_info(&self, hostname: &str) -> LidarResult<SensorMetadata> {
        let handle = self.registry.get(hostname)?;
        let mut sensor = handle.lock().await;
        let metadata = sensor.metadata().await?;
        Ok(metadata)
    }

    /// Cached listing of every connection, in connection order.
    pub fn connected(&self) -> Vec<ConnectionSummary> {
        self.registry.summaries()
    }

    /// Capture one scan and reduce it to summary statistics.
    pub async fn capture(&self, hostname: &str) -> LidarResult<ScanSummary> {
        let scan = self.capture_scan(hostname).await?;
        let summary = summarize(&scan);
        tracing::info!(
            "Captured frame {} from {hostname}: {} valid returns",
            summary.frame_id,
            summary.num_valid_returns
        );
        Ok(summary)
    }

    /// Capture one scan and report each channel over the whole grid.
    pub async fn scan_fields(&self, hostname: &str, progress: &Progress) -> LidarResult<ScanFieldReport> {
        progress.report(1, 3);
        let scan = self.capture_scan(hostname).await?;
        progress.report(2, 3);
        let report = field_report(&scan);
        progress.report(3, 3);
        tracing::info!("Read {} fields of frame {} from {hostname}", report.fields.len(), report.frame_id);
        Ok(report)
    }

    /// One scan, with the wait for the sensor and the read bounded together.
    async fn capture_scan(&self, hostname: &str) -> LidarResult<LidarScan> {
        let handle = self.registry.get(hostname)?;
        with_capture_timeout(hostname, self.capture_timeout, async move {
            let mut sensor = handle.lock().await;
            let scan = sensor.read_scan().await?;
            Ok(scan)
        })
        .await
    }

    async fn read_scan(&self, hostname: &str, sensor: &mut dyn SensorHandle) -> LidarResult<LidarScan> {
        with_capture_timeout(hostname, self.capture_timeout, sensor.read_scan()).await
    }

    /// Apply each valid key independently; see [`config_params::partition`].
    pub async fn configure(&self, hostname: &str, config: &Map<String, Value>) -> LidarResult<ConfigOutcome> {
        let handle = self.registry.get(hostname)?;
        let (accepted, mut outcome) = config_params::partition(config)?;
        for rejected in &outcome.rejected {
            tracing::warn!("Rejected config key {} for {hostname}: {}", rejected.key, rejected.reason);
        }

        let mut sensor = handle.lock().await;
        for (key, value) in accepted {
            match sensor.set_config(&key, &value).await {
                Ok(()) => {
                    tracing::info!("Set {key}={value} on {hostname}");
                    outcome.applied.push(key);
                }
                Err(e) => {
                    tracing::warn!("Sensor {hostname} rejected {key}: {e}");
                    outcome.reject(key, e.to_string());
                }
            }
        }
        Ok(outcome)
    }

    /// Capture consecutive scans while holding the sensor.
    pub async fn stream(&self, hostname: &str, num_scans: usize) -> LidarResult<StreamOutcome> {
        self.stream_with_progress(hostname, num_scans, &Progress::none()).await
    }

    /// [`stream`](Self::stream), reporting each captured frame to `progress`.
    pub async fn stream_with_progress(
        &self,
        hostname: &str,
        num_scans: usize,
        progress: &Progress,
    ) -> LidarResult<StreamOutcome> {
        if !(1..=MAX_STREAM_SCANS).contains(&num_scans) {
            return Err(LidarError::InvalidInput(format!(
                "num_scans must be between 1 and {MAX_STREAM_SCANS}, got {num_scans}"
            )));
        }
        let handle = self.registry.get(hostname)?;
        let mut sensor =
            with_capture_timeout(hostname, self.capture_timeout, async { Ok(handle.lock().await) }).await?;

        let mut outcome = StreamOutcome {
            requested: num_scans,
            frames: Vec::with_capacity(num_scans),
            error: None,
        };
        for _ in 0..num_scans {
            match self.read_scan(hostname, &mut **sensor).await {
                Ok(scan) => {
                    outcome.frames.push(StreamFrame {
                        frame_id: scan.frame_id,
                        valid_returns: scan.valid_returns(),
                        range_mean: valid_range_mean(&scan),
                    });
                    progress.report(outcome.frames.len(), num_scans);
                }
                Err(e) => {
                    tracing::warn!(
                        "Stream from {hostname} stopped after {} scans: {e}",
                        outcome.frames.len()
                    );
                    outcome.error = Some(e);
                    break;
                }
            }
        }
        Ok(outcome)
    }

    /// Capture one scan and analyze it as a point cloud.
    pub async fn point_cloud(&self, hostname: &str, max_distance: Option<f64>) -> LidarResult<PointCloudReport> {
        if let Some(d) = max_distance {
            if !d.is_finite() || d <= 0.0 {
                return Err(LidarError::InvalidInput(format!(
                    "max_distance must be a positive number of meters, got {d}"
                )));
            }
        }
        let handle = self.registry.get(hostname)?;
        let (metadata, scan) = with_capture_timeout(hostname, self.capture_timeout, async {
            let mut sensor = handle.lock().await;
            let metadata = sensor.metadata().await?;
            let scan = sensor.read_scan().await?;
            Ok((metadata, scan))
        })
        .await?;
        let lut = XyzLut::new(&metadata)?;
        analyze(&scan, &lut, max_distance)
    }

    /// Search the network, marking sensors that are already registered.
    pub async fn discover(&self) -> LidarResult<Vec<DiscoveredSensor>> {
        let mut sensors = run_discovery(&self.discover_command, self.discovery_timeout).await?;
        for sensor in &mut sensors {
            if self.registry.contains(&sensor.hostname) || self.registry.contains(&sensor.ip) {
                sensor.connection_status = "connected".to_string();
            }
        }
        tracing::info!("Discovery found {} sensor(s)", sensors.len());
        Ok(sensors)
    }

    /// Close every registered sensor. Returns how many were released.
    pub async fn shutdown(&self) -> usize {
        let entries = self.registry.drain();
        let count = entries.len();
        for entry in entries {
            let handle = entry.handle();
            let result = handle.lock().await.close().await;
            if let Err(e) = result {
                tracing::warn!("Error closing {} during shutdown: {e}", entry.identifier);
            }
        }
        if count > 0 {
            tracing::info!("Closed {count} sensor connection(s)");
        }
        count
    }
}

fn already_connected(existing: ConnectionSummary) -> ConnectOutcome {
    ConnectOutcome {
        status: ConnectStatus::AlreadyConnected,
        hostname: existing.identifier,
        identity: existing.identity,
    }
}

async fn with_capture_timeout<T, F>(hostname: &str, timeout: Duration, read: F) -> LidarResult<T>
where
    F: Future<Output = LidarResult<T>>,
{
    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| LidarError::CaptureTimeout {
            hostname: hostname.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })?
}
