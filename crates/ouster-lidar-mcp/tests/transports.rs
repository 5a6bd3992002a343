//! Stdio and HTTP transports driven in-process.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use common::*;
use ouster_lidar_mcp::StdioTransport;

// ─── stdio ───

#[tokio::test]
async fn test_stdio_round_trip() {
    let (handler, _) = fake_handler(FakeBehavior::default());
    let transport = StdioTransport::new(Arc::new(handler));

    let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
    let (server_out, mut client_out) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(async move { transport.serve(BufReader::new(server_in), server_out).await });

    let lines = [
        init_request().to_string(),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        String::new(),
        "this is not json".to_string(),
        mcp_request(2, "tools/list", json!({})).to_string(),
        mcp_request(3, "ping", json!({})).to_string(),
    ];
    for line in &lines {
        client_in.write_all(line.as_bytes()).await.unwrap();
        client_in.write_all(b"\n").await.unwrap();
    }
    drop(client_in);

    let mut output = String::new();
    client_out.read_to_string(&mut output).await.unwrap();
    server.await.unwrap().unwrap();

    let responses: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 4, "{output}");

    let by_id: HashMap<String, &Value> = responses.iter().map(|r| (r["id"].to_string(), r)).collect();
    assert_eq!(by_id["0"]["result"]["serverInfo"]["name"], "ouster-lidar-mcp");
    assert!(by_id["2"]["result"]["tools"].is_array());
    assert_eq!(by_id["3"]["result"], json!({}));
    assert_eq!(by_id["null"]["error"]["code"], -32700);
}

#[tokio::test]
async fn test_stdio_slow_sensor_does_not_block_others() {
    let behavior = FakeBehavior {
        slow_hosts: vec!["slow.local".to_string()],
        slow_scan_delay: std::time::Duration::from_millis(300),
        ..FakeBehavior::default()
    };
    let (handler, _) = fake_handler(behavior);
    for host in ["slow.local", "fast.local"] {
        call_tool(&handler, "connect_sensor", json!({ "hostname": host })).await;
    }
    let transport = StdioTransport::new(Arc::new(handler));

    let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
    let (server_out, client_out) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(async move { transport.serve(BufReader::new(server_in), server_out).await });

    for (id, host) in [(1, "slow.local"), (2, "fast.local")] {
        let request = mcp_request(
            id,
            "tools/call",
            json!({ "name": "capture_single_scan", "arguments": { "hostname": host } }),
        );
        client_in.write_all(format!("{request}\n").as_bytes()).await.unwrap();
    }
    drop(client_in);

    let mut output = String::new();
    BufReader::new(client_out).read_to_string(&mut output).await.unwrap();
    server.await.unwrap().unwrap();

    let ids: Vec<i64> = output
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["id"].as_i64().unwrap())
        .collect();
    // Responses are written in completion order.
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_stdio_progress_precedes_response() {
    let handler = simulated_handler();
    call_tool(&handler, "connect_sensor", json!({ "hostname": "os-1.local" })).await;
    let transport = StdioTransport::new(Arc::new(handler));

    let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
    let (server_out, mut client_out) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(async move { transport.serve(BufReader::new(server_in), server_out).await });

    let request = mcp_request(
        4,
        "tools/call",
        json!({
            "name": "stream_scans",
            "arguments": { "hostname": "os-1.local", "num_scans": 3 },
            "_meta": { "progressToken": 11 }
        }),
    );
    client_in.write_all(format!("{request}\n").as_bytes()).await.unwrap();
    drop(client_in);

    let mut output = String::new();
    client_out.read_to_string(&mut output).await.unwrap();
    server.await.unwrap().unwrap();

    let messages: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(messages.len(), 4, "{output}");
    for (i, update) in messages[..3].iter().enumerate() {
        assert_eq!(update["method"], "notifications/progress");
        assert!(update.get("id").is_none());
        assert_eq!(update["params"]["progressToken"], 11);
        assert_eq!(update["params"]["progress"], (i + 1) as f64);
    }
    assert_eq!(messages[3]["id"], 4);
    assert!(messages[3]["result"]["content"].is_array());
}

// ─── http ───

#[cfg(feature = "sse")]
mod http {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tokio_stream::StreamExt;
    use tower::ServiceExt;

    use super::*;
    use ouster_lidar_mcp::transport::SseTransport;

    fn router(token: Option<&str>) -> Router {
        let (handler, _) = fake_handler(FakeBehavior::default());
        SseTransport::new(Arc::new(handler), token.map(str::to_string)).router()
    }

    fn post(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let response = router(Some("secret"))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sensors"], 0);
    }

    #[tokio::test]
    async fn test_direct_request() {
        let response = router(None)
            .oneshot(post("/mcp", &mcp_request(1, "tools/list", json!({})), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_bearer_token_enforced() {
        let app = router(Some("secret"));
        let request = mcp_request(1, "ping", json!({}));

        let response = app.clone().oneshot(post("/mcp", &request, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], -32900);

        let response = app
            .clone()
            .oneshot(post("/mcp", &request, Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(post("/mcp", &request, Some("secret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_direct_request() {
        let response = router(None)
            .oneshot(post("/mcp", &json!({ "hello": "world" }), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let response = router(None)
            .oneshot(post(
                "/messages?session_id=does-not-exist",
                &mcp_request(1, "ping", json!({})),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sse_session_round_trip() {
        let app = router(None);

        let response = app
            .clone()
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut events = response.into_body().into_data_stream();

        let first = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let first = String::from_utf8_lossy(&first).to_string();
        assert!(first.contains("event: endpoint"), "{first}");

        let endpoint = first
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap()
            .trim()
            .to_string();
        assert!(endpoint.starts_with("/messages?session_id="));

        let response = app
            .oneshot(post(&endpoint, &mcp_request(7, "ping", json!({})), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let event = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let event = String::from_utf8_lossy(&event).to_string();
        assert!(event.contains("event: message"), "{event}");

        let data = event
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap();
        let reply: Value = serde_json::from_str(data).unwrap();
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["result"], json!({}));
    }
}
