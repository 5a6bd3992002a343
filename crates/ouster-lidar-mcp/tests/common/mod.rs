//! Shared fixtures: an instrumented fake sensor and protocol helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use ouster_lidar::{
    LidarError, LidarResult, LidarScan, SensorConnector, SensorHandle, SensorMetadata,
    SimulatedConnector,
};
use ouster_lidar_mcp::config::ServerConfig;
use ouster_lidar_mcp::protocol::ProtocolHandler;
use ouster_lidar_mcp::session::LidarSession;
use ouster_lidar_mcp::types::JsonRpcMessage;

// ─────────────────────── fake sensor ───────────────────────

/// Counters and an event log shared by every handle a [`FakeConnector`] opens.
#[derive(Default)]
pub struct SensorLog {
    pub connects: AtomicUsize,
    pub scans: AtomicUsize,
    pub set_configs: AtomicUsize,
    pub closes: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub events: Mutex<Vec<String>>,
}

impl SensorLog {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// Behavior knobs for the fake sensor.
#[derive(Clone, Default)]
pub struct FakeBehavior {
    pub connect_delay: Duration,
    pub scan_delay: Duration,
    /// Hosts whose scans take `slow_scan_delay` instead.
    pub slow_hosts: Vec<String>,
    pub slow_scan_delay: Duration,
    pub empty_scans: bool,
    pub fail_metadata: bool,
    pub fail_close: bool,
    /// Keys the sensor itself refuses.
    pub refused_keys: Vec<String>,
}

#[derive(Clone)]
pub struct FakeConnector {
    pub log: Arc<SensorLog>,
    pub behavior: FakeBehavior,
}

impl FakeConnector {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            log: Arc::new(SensorLog::default()),
            behavior,
        }
    }
}

#[async_trait]
impl SensorConnector for FakeConnector {
    async fn connect(&self, hostname: &str) -> LidarResult<Box<dyn SensorHandle>> {
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.behavior.connect_delay).await;
        if hostname.starts_with("bad-") {
            return Err(LidarError::ConnectFailed {
                hostname: hostname.to_string(),
                reason: "host unreachable".to_string(),
            });
        }
        let scan_delay = if self.behavior.slow_hosts.iter().any(|h| h == hostname) {
            self.behavior.slow_scan_delay
        } else {
            self.behavior.scan_delay
        };
        Ok(Box::new(FakeSensor {
            hostname: hostname.to_string(),
            log: self.log.clone(),
            behavior: self.behavior.clone(),
            scan_delay,
            frame_id: 0,
        }))
    }
}

pub struct FakeSensor {
    hostname: String,
    log: Arc<SensorLog>,
    behavior: FakeBehavior,
    scan_delay: Duration,
    frame_id: u64,
}

pub const BEAMS: usize = 64;
pub const COLUMNS: usize = 1024;

pub fn fake_metadata() -> SensorMetadata {
    SensorMetadata {
        serial: "122222000123".to_string(),
        model: "OS-1-64".to_string(),
        firmware_version: "v2.5.3".to_string(),
        lidar_mode: "1024x10".to_string(),
        status: "RUNNING".to_string(),
        azimuth_window: [0, 360_000],
        beam_altitude_angles: (0..BEAMS).map(|i| 16.0 - 0.5 * i as f64).collect(),
        beam_azimuth_angles: vec![0.0; BEAMS],
        lidar_origin_to_beam_origin_mm: 15.8,
        pixels_per_column: BEAMS,
        columns_per_frame: COLUMNS,
        udp_port_lidar: 7502,
        udp_port_imu: 7503,
    }
}

#[async_trait]
impl SensorHandle for FakeSensor {
    async fn metadata(&mut self) -> LidarResult<SensorMetadata> {
        if self.behavior.fail_metadata {
            return Err(LidarError::Sensor("metadata endpoint returned 500".to_string()));
        }
        Ok(fake_metadata())
    }

    async fn read_scan(&mut self) -> LidarResult<LidarScan> {
        self.log.scans.fetch_add(1, Ordering::SeqCst);
        let now = self.log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.log.record(format!("read_start {}", self.hostname));

        tokio::time::sleep(self.scan_delay).await;

        self.log.record(format!("read_end {}", self.hostname));
        self.log.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.frame_id += 1;
        let mut scan = LidarScan::new(self.frame_id, BEAMS, COLUMNS);
        if !self.behavior.empty_scans {
            for ((row, col), range) in scan.range.indexed_iter_mut() {
                if (row + col) % 10 != 0 {
                    *range = 1_000 + (row * 37 + col) as u32 % 20_000;
                }
            }
            scan.signal.fill(120);
            scan.reflectivity.fill(40);
        }
        Ok(scan)
    }

    async fn set_config(&mut self, key: &str, _value: &Value) -> LidarResult<()> {
        self.log.set_configs.fetch_add(1, Ordering::SeqCst);
        if self.behavior.refused_keys.iter().any(|k| k == key) {
            return Err(LidarError::Sensor(format!("sensor refused {key}")));
        }
        Ok(())
    }

    async fn close(&mut self) -> LidarResult<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("close {}", self.hostname));
        if self.behavior.fail_close {
            return Err(LidarError::Sensor("socket already gone".to_string()));
        }
        Ok(())
    }
}

// ─────────────────────── protocol helpers ───────────────────────

pub fn fast_config() -> ServerConfig {
    ServerConfig {
        connect_timeout: Duration::from_millis(500),
        capture_timeout: Duration::from_millis(500),
        ..ServerConfig::default()
    }
}

pub fn handler_with(connector: Arc<dyn SensorConnector>, config: &ServerConfig) -> ProtocolHandler {
    ProtocolHandler::new(Arc::new(LidarSession::new(connector, config)))
}

/// Handler over fast simulated sensors.
pub fn simulated_handler() -> ProtocolHandler {
    let connector = SimulatedConnector::new().with_frame_period(Duration::from_millis(1));
    handler_with(Arc::new(connector), &fast_config())
}

/// Handler over a fake connector with default behavior, plus its call log.
pub fn fake_handler(behavior: FakeBehavior) -> (ProtocolHandler, Arc<SensorLog>) {
    let connector = FakeConnector::new(behavior);
    let log = connector.log.clone();
    (handler_with(Arc::new(connector), &fast_config()), log)
}

pub fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

pub fn init_request() -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

pub async fn send(handler: &ProtocolHandler, msg: Value) -> Option<Value> {
    let parsed: JsonRpcMessage = serde_json::from_value(msg).unwrap();
    handler.handle_message(parsed).await
}

pub async fn send_unwrap(handler: &ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

/// Call a tool and return `(is_error, parsed JSON body)`.
pub async fn call_tool(handler: &ProtocolHandler, name: &str, arguments: Value) -> (bool, Value) {
    let response = send_unwrap(
        handler,
        mcp_request(1, "tools/call", json!({ "name": name, "arguments": arguments })),
    )
    .await;
    let result = &response["result"];
    assert!(result.is_object(), "expected a tool result, got {response}");
    let is_error = result["isError"].as_bool().unwrap_or(false);
    let text = result["content"][0]["text"].as_str().unwrap();
    (is_error, serde_json::from_str(text).unwrap())
}

pub async fn connected_hostnames(handler: &ProtocolHandler) -> Vec<String> {
    let (_, body) = call_tool(handler, "get_connected_sensors", json!({})).await;
    serde_json::from_value(body["sensors"].clone()).unwrap()
}
