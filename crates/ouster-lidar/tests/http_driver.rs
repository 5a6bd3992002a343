//! REST driver tests against a mock sensor API.

use std::time::Duration;

use ouster_lidar::{LidarError, OusterHttpConnector, SensorConnector};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ─── helpers ────────────────────────────────────────────────────────

async fn mock_sensor() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sensor/metadata/sensor_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prod_line": "OS-1-64",
            "prod_sn": 122222000123u64,
            "build_rev": "v2.5.3",
            "status": "RUNNING"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sensor/metadata/lidar_data_format"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pixels_per_column": 64,
            "columns_per_frame": 1024
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sensor/metadata/beam_intrinsics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "beam_altitude_angles": [16.6, 0.0, -16.6],
            "beam_azimuth_angles": [3.1, 1.0, -1.0],
            "lidar_origin_to_beam_origin_mm": 15.806
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sensor/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lidar_mode": "1024x10",
            "azimuth_window": [0, 360000],
            "udp_port_lidar": 7502,
            "udp_port_imu": 7503
        })))
        .mount(&server)
        .await;

    server
}

fn connector() -> OusterHttpConnector {
    OusterHttpConnector::new(Duration::from_secs(2))
}

// ─── metadata ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_metadata_combines_endpoints() {
    let server = mock_sensor().await;
    let mut sensor = connector().connect(&server.uri()).await.unwrap();

    let meta = sensor.metadata().await.unwrap();
    assert_eq!(meta.serial, "122222000123");
    assert_eq!(meta.model, "OS-1-64");
    assert_eq!(meta.firmware_version, "v2.5.3");
    assert_eq!(meta.lidar_mode, "1024x10");
    assert_eq!(meta.pixels_per_column, 64);
    assert_eq!(meta.columns_per_frame, 1024);
    assert_eq!(meta.beam_altitude_angles.len(), 3);
    assert_eq!(meta.udp_port_imu, 7503);
}

#[tokio::test]
async fn test_scan_capture_is_unsupported_over_rest() {
    let server = mock_sensor().await;
    let mut sensor = connector().connect(&server.uri()).await.unwrap();
    let err = sensor.read_scan().await.unwrap_err();
    assert_eq!(err.kind(), "unsupported");
}

// ─── configuration ──────────────────────────────────────────────────

#[tokio::test]
async fn test_set_config_posts_single_key() {
    let server = mock_sensor().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sensor/config"))
        .and(body_json(json!({ "operating_mode": "NORMAL" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut sensor = connector().connect(&server.uri()).await.unwrap();
    sensor
        .set_config("operating_mode", &json!("NORMAL"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_config_rejection_carries_sensor_reason() {
    let server = mock_sensor().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sensor/config"))
        .respond_with(ResponseTemplate::new(400).set_body_string("lidar_mode not supported"))
        .mount(&server)
        .await;

    let mut sensor = connector().connect(&server.uri()).await.unwrap();
    let err = sensor
        .set_config("lidar_mode", &json!("4096x5"))
        .await
        .unwrap_err();
    match err {
        LidarError::Sensor(reason) => {
            assert!(reason.contains("lidar_mode"));
            assert!(reason.contains("not supported"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ─── connection ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_to_unreachable_host_fails() {
    let err = connector()
        .connect("http://127.0.0.1:1")
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), "connect_failed");
    assert!(err.to_string().contains("unreachable"));
}

#[tokio::test]
async fn test_connect_requires_sensor_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = connector().connect(&server.uri()).await.err().unwrap();
    assert!(matches!(err, LidarError::ConnectFailed { .. }));
}

#[tokio::test]
async fn test_closed_handle_refuses_requests() {
    let server = mock_sensor().await;
    let mut sensor = connector().connect(&server.uri()).await.unwrap();
    sensor.close().await.unwrap();
    sensor.close().await.unwrap();
    assert!(sensor.metadata().await.is_err());
}
