//! Sensor driver over the Ouster HTTP REST control API.
//!
//! Metadata comes from `/api/v1/sensor/metadata/*` and configuration is written
//! one parameter at a time to `/api/v1/sensor/config`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::sensor::{SensorConnector, SensorHandle};
use crate::types::{LidarError, LidarResult, LidarScan, SensorMetadata};

/// Default per-request timeout for the REST API.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept either a JSON string or number (firmware versions differ).
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorInfo {
    #[serde(default)]
    pub prod_line: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub prod_sn: String,
    #[serde(default)]
    pub build_rev: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LidarDataFormat {
    #[serde(default)]
    pub pixels_per_column: usize,
    #[serde(default)]
    pub columns_per_frame: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeamIntrinsics {
    #[serde(default)]
    pub beam_altitude_angles: Vec<f64>,
    #[serde(default)]
    pub beam_azimuth_angles: Vec<f64>,
    #[serde(default)]
    pub lidar_origin_to_beam_origin_mm: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub lidar_mode: String,
    #[serde(default)]
    pub azimuth_window: [u32; 2],
    #[serde(default)]
    pub udp_port_lidar: u16,
    #[serde(default)]
    pub udp_port_imu: u16,
}

/// Describe a transport failure in terms a caller can act on.
fn describe(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("connection timeout after {} s", timeout.as_secs())
    } else if err.is_connect() {
        format!("host unreachable: {err}")
    } else if err.is_decode() {
        format!("malformed sensor response: {err}")
    } else if let Some(status) = err.status() {
        format!("sensor returned HTTP {status}")
    } else {
        err.to_string()
    }
}

/// Base URL of the sensor API for a hostname, or for a full URL when given one.
pub fn api_base(hostname: &str) -> String {
    let root = if hostname.contains("://") {
        hostname.trim_end_matches('/').to_string()
    } else {
        format!("http://{hostname}")
    };
    format!("{root}/api/v1/sensor")
}

/// Opens [`OusterHttpSensor`] handles.
#[derive(Debug, Clone)]
pub struct OusterHttpConnector {
    request_timeout: Duration,
}

impl OusterHttpConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for OusterHttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl SensorConnector for OusterHttpConnector {
    async fn connect(&self, hostname: &str) -> LidarResult<Box<dyn SensorHandle>> {
        let connect_failed = |reason: String| LidarError::ConnectFailed {
            hostname: hostname.to_string(),
            reason,
        };

        let client = reqwest::Client::builder()
            .connect_timeout(self.request_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| connect_failed(e.to_string()))?;

        let sensor = OusterHttpSensor {
            client,
            api: api_base(hostname),
            timeout: self.request_timeout,
            closed: false,
        };

        // Handshake: the sensor must answer its identity endpoint.
        let info: SensorInfo = sensor
            .get_json("metadata/sensor_info")
            .await
            .map_err(|e| match e {
                LidarError::Sensor(reason) => connect_failed(reason),
                other => other,
            })?;
        tracing::info!(
            "Connected to {} {} (serial {}, {})",
            hostname,
            info.prod_line,
            info.prod_sn,
            info.status
        );

        Ok(Box::new(sensor))
    }
}

/// A sensor reached through its REST API.
pub struct OusterHttpSensor {
    client: reqwest::Client,
    api: String,
    timeout: Duration,
    closed: bool,
}

impl OusterHttpSensor {
    fn ensure_open(&self) -> LidarResult<()> {
        if self.closed {
            return Err(LidarError::Sensor("connection is closed".to_string()));
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> LidarResult<T> {
        let url = format!("{}/{path}", self.api);
        tracing::debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| LidarError::Sensor(describe(&e, self.timeout)))?;
        response
            .json()
            .await
            .map_err(|e| LidarError::Sensor(describe(&e, self.timeout)))
    }
}

#[async_trait]
impl SensorHandle for OusterHttpSensor {
    async fn metadata(&mut self) -> LidarResult<SensorMetadata> {
        self.ensure_open()?;
        let info: SensorInfo = self.get_json("metadata/sensor_info").await?;
        let format: LidarDataFormat = self.get_json("metadata/lidar_data_format").await?;
        let beams: BeamIntrinsics = self.get_json("metadata/beam_intrinsics").await?;
        let config: SensorConfig = self.get_json("config").await?;

        Ok(SensorMetadata {
            serial: info.prod_sn,
            model: info.prod_line,
            firmware_version: info.build_rev,
            lidar_mode: config.lidar_mode,
            status: info.status,
            azimuth_window: config.azimuth_window,
            beam_altitude_angles: beams.beam_altitude_angles,
            beam_azimuth_angles: beams.beam_azimuth_angles,
            lidar_origin_to_beam_origin_mm: beams.lidar_origin_to_beam_origin_mm,
            pixels_per_column: format.pixels_per_column,
            columns_per_frame: format.columns_per_frame,
            udp_port_lidar: config.udp_port_lidar,
            udp_port_imu: config.udp_port_imu,
        })
    }

    async fn read_scan(&mut self) -> LidarResult<LidarScan> {
        self.ensure_open()?;
        Err(LidarError::Unsupported(
            "scan capture needs a UDP scan source; the HTTP control API only serves metadata and configuration"
                .to_string(),
        ))
    }

    async fn set_config(&mut self, key: &str, value: &Value) -> LidarResult<()> {
        self.ensure_open()?;
        let url = format!("{}/config", self.api);
        tracing::debug!("POST {url} {key}={value}");

        let mut body = Map::new();
        body.insert(key.to_string(), value.clone());

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LidarError::Sensor(describe(&e, self.timeout)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(LidarError::Sensor(format!(
            "sensor rejected {key} (HTTP {status}): {}",
            body.trim()
        )))
    }

    async fn close(&mut self) -> LidarResult<()> {
        self.closed = true;
        Ok(())
    }
}
