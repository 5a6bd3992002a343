//! Simulated sensors for development without hardware.
//!
//! A simulated sensor behaves like an OS-1-64: it reports metadata, accepts
//! configuration, and produces deterministic synthetic scans at the frame rate
//! of its lidar mode. Hostnames starting with `bad-` or ending in `.invalid`
//! behave as unreachable.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::config_params;
use crate::sensor::{SensorConnector, SensorHandle};
use crate::types::{LidarError, LidarResult, LidarScan, SensorMetadata};

const BEAMS: usize = 64;
const DEFAULT_LIDAR_MODE: &str = "1024x10";
const MAX_RANGE_MM: u32 = 120_000;

/// Share of pixels without a return.
const DROPOUT: f64 = 0.1;

fn parse_lidar_mode(mode: &str) -> Option<(usize, u64)> {
    let (columns, hz) = mode.split_once('x')?;
    Some((columns.parse().ok()?, hz.parse().ok()?))
}

fn is_unreachable(hostname: &str) -> bool {
    hostname.starts_with("bad-") || hostname.ends_with(".invalid")
}

/// Opens [`SimulatedSensor`] handles.
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector {
    frame_period: Option<Duration>,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the delay before each scan, instead of the lidar mode's frame period.
    pub fn with_frame_period(mut self, period: Duration) -> Self {
        self.frame_period = Some(period);
        self
    }
}

#[async_trait]
impl SensorConnector for SimulatedConnector {
    async fn connect(&self, hostname: &str) -> LidarResult<Box<dyn SensorHandle>> {
        if hostname.trim().is_empty() || is_unreachable(hostname) {
            return Err(LidarError::ConnectFailed {
                hostname: hostname.to_string(),
                reason: "host unreachable".to_string(),
            });
        }
        tracing::info!("Opened simulated sensor {hostname}");
        Ok(Box::new(SimulatedSensor::new(hostname, self.frame_period)))
    }
}

/// An in-process stand-in for a sensor.
pub struct SimulatedSensor {
    seed: u64,
    frame_id: u64,
    frame_period: Option<Duration>,
    lidar_mode: String,
    operating_mode: String,
    azimuth_window: [u32; 2],
    udp_port_lidar: u16,
    udp_port_imu: u16,
    extra: Map<String, Value>,
    closed: bool,
}

impl SimulatedSensor {
    pub fn new(hostname: &str, frame_period: Option<Duration>) -> Self {
        let mut hasher = DefaultHasher::new();
        hostname.hash(&mut hasher);
        Self {
            seed: hasher.finish(),
            frame_id: 0,
            frame_period,
            lidar_mode: DEFAULT_LIDAR_MODE.to_string(),
            operating_mode: "NORMAL".to_string(),
            azimuth_window: [0, 360_000],
            udp_port_lidar: 7502,
            udp_port_imu: 7503,
            extra: Map::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> LidarResult<()> {
        if self.closed {
            return Err(LidarError::Sensor("connection is closed".to_string()));
        }
        Ok(())
    }

    fn serial(&self) -> String {
        format!("99{:010}", self.seed % 10_000_000_000)
    }

    fn columns_and_rate(&self) -> (usize, u64) {
        parse_lidar_mode(&self.lidar_mode).unwrap_or((1024, 10))
    }

    /// Synthetic scene: a room whose walls sit at a distance that varies
    /// smoothly with azimuth and beam, plus sparse dropouts.
    fn synthesize(&self, frame_id: u64) -> LidarScan {
        let (width, _) = self.columns_and_rate();
        let mut rng = StdRng::seed_from_u64(self.seed ^ frame_id);
        let mut scan = LidarScan::new(frame_id, BEAMS, width);

        for ((row, col), range) in scan.range.indexed_iter_mut() {
            if rng.gen_bool(DROPOUT) {
                continue;
            }
            let azimuth = col as f64 / width as f64 * std::f64::consts::TAU;
            let base = 8_000.0 + 4_000.0 * azimuth.sin().abs() + 60.0 * row as f64;
            let noise = rng.gen_range(-50.0..50.0);
            *range = ((base + noise) as u32).clamp(1, MAX_RANGE_MM);
        }
        for ((row, col), signal) in scan.signal.indexed_iter_mut() {
            if scan.range[[row, col]] > 0 {
                *signal = rng.gen_range(5..1500);
            }
        }
        for ((row, col), reflectivity) in scan.reflectivity.indexed_iter_mut() {
            if scan.range[[row, col]] > 0 {
                *reflectivity = rng.gen_range(1..=255);
            }
        }
        for near_ir in scan.near_ir.iter_mut() {
            *near_ir = rng.gen_range(0..3000);
        }
        scan
    }
}

#[async_trait]
impl SensorHandle for SimulatedSensor {
    async fn metadata(&mut self) -> LidarResult<SensorMetadata> {
        self.ensure_open()?;
        let (columns, _) = self.columns_and_rate();
        Ok(SensorMetadata {
            serial: self.serial(),
            model: "OS-1-64".to_string(),
            firmware_version: "v2.5.3".to_string(),
            lidar_mode: self.lidar_mode.clone(),
            status: if self.operating_mode == "STANDBY" {
                "STANDBY".to_string()
            } else {
                "RUNNING".to_string()
            },
            azimuth_window: self.azimuth_window,
            beam_altitude_angles: (0..BEAMS)
                .map(|i| 22.5 - 45.0 * i as f64 / (BEAMS - 1) as f64)
                .collect(),
            beam_azimuth_angles: (0..BEAMS).map(|i| 3.1 - 2.07 * (i % 4) as f64).collect(),
            lidar_origin_to_beam_origin_mm: 15.806,
            pixels_per_column: BEAMS,
            columns_per_frame: columns,
            udp_port_lidar: self.udp_port_lidar,
            udp_port_imu: self.udp_port_imu,
        })
    }

    async fn read_scan(&mut self) -> LidarResult<LidarScan> {
        self.ensure_open()?;
        if self.operating_mode == "STANDBY" {
            return Err(LidarError::Sensor(
                "sensor is in STANDBY; set operating_mode to NORMAL".to_string(),
            ));
        }

        let (_, hz) = self.columns_and_rate();
        let period = self
            .frame_period
            .unwrap_or_else(|| Duration::from_millis(1000 / hz.max(1)));
        tokio::time::sleep(period).await;

        self.frame_id += 1;
        Ok(self.synthesize(self.frame_id))
    }

    async fn set_config(&mut self, key: &str, value: &Value) -> LidarResult<()> {
        self.ensure_open()?;
        config_params::validate(key, value).map_err(|e| LidarError::Sensor(e.to_string()))?;

        match key {
            "lidar_mode" => self.lidar_mode = value.as_str().unwrap_or(DEFAULT_LIDAR_MODE).to_string(),
            "operating_mode" => self.operating_mode = value.as_str().unwrap_or("NORMAL").to_string(),
            "udp_port_lidar" => self.udp_port_lidar = value.as_u64().unwrap_or(7502) as u16,
            "udp_port_imu" => self.udp_port_imu = value.as_u64().unwrap_or(7503) as u16,
            "azimuth_window" => {
                if let Some([start, end]) = value
                    .as_array()
                    .map(|w| w.iter().filter_map(Value::as_u64).map(|d| d as u32).collect::<Vec<_>>())
                    .and_then(|w| <[u32; 2]>::try_from(w).ok())
                {
                    self.azimuth_window = [start, end];
                }
            }
            _ => {
                self.extra.insert(key.to_string(), value.clone());
            }
        }
        tracing::debug!("Simulated sensor set {key}={value}");
        Ok(())
    }

    async fn close(&mut self) -> LidarResult<()> {
        self.closed = true;
        Ok(())
    }
}
