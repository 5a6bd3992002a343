//! HTTP transport: SSE sessions, direct JSON-RPC, bearer auth, and /health.
//!
//! `GET /sse` opens an event stream whose first `endpoint` event names the
//! URL to post messages to. Responses to `POST /messages?session_id=...` are
//! delivered as `message` events on that stream, along with any progress
//! notifications. `POST /mcp` answers inline and sends no notifications.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json as AxumJson, Response,
    },
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

type SessionSender = mpsc::UnboundedSender<Value>;

/// Shared server state passed to all handlers via axum State.
pub struct ServerState {
    pub token: Option<String>,
    pub handler: Arc<ProtocolHandler>,
    sessions: Mutex<HashMap<String, SessionSender>>,
}

impl ServerState {
    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionSender>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes an SSE session when its stream is dropped.
struct SessionGuard {
    id: String,
    state: Arc<ServerState>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.sessions().remove(&self.id);
        tracing::debug!("SSE session {} closed", self.id);
    }
}

/// HTTP transport for web-based MCP clients.
pub struct SseTransport {
    state: Arc<ServerState>,
}

impl SseTransport {
    pub fn new(handler: Arc<ProtocolHandler>, token: Option<String>) -> Self {
        Self {
            state: Arc::new(ServerState {
                token,
                handler,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn router(&self) -> Router {
        let state = self.state.clone();

        Router::new()
            .route("/sse", get(handle_sse))
            .route("/messages", post(handle_session_message))
            .route("/mcp", post(handle_request))
            .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
            .route("/health", get(handle_health))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Serve on `addr` until `shutdown` resolves.
    pub async fn run<F>(&self, addr: &str, shutdown: F) -> McpResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP transport listening on {addr} (SSE at /sse)");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))
    }
}

fn rpc_error(status: StatusCode, err: McpError) -> Response {
    (status, AxumJson(json!(err.to_json_rpc_error(RequestId::Null)))).into_response()
}

/// Checks the bearer token if one is configured.
/// /health is routed outside this layer.
async fn auth_layer(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    if let Some(expected) = &state.token {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected);

        if !authorized {
            return rpc_error(StatusCode::UNAUTHORIZED, McpError::Unauthorized);
        }
    }

    next.run(request).await
}

async fn handle_sse(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::unbounded_channel();
    state.sessions().insert(id.clone(), tx);
    tracing::debug!("SSE session {id} opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={id}"));
    let guard = SessionGuard {
        id,
        state: state.clone(),
    };

    let messages = UnboundedReceiverStream::new(rx).map(move |response: Value| {
        let _session = &guard;
        Ok(Event::default().event("message").data(response.to_string()))
    });

    Sse::new(tokio_stream::once(Ok(endpoint)).chain(messages)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

async fn handle_session_message(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SessionQuery>,
    AxumJson(body): AxumJson<Value>,
) -> Response {
    let Some(tx) = state.sessions().get(&query.session_id).cloned() else {
        return rpc_error(
            StatusCode::NOT_FOUND,
            McpError::SessionNotFound(query.session_id),
        );
    };

    let msg: JsonRpcMessage = match serde_json::from_value(body) {
        Ok(msg) => msg,
        Err(e) => return rpc_error(StatusCode::BAD_REQUEST, McpError::InvalidRequest(e.to_string())),
    };

    let handler = state.handler.clone();
    tokio::spawn(async move {
        if let Some(response) = handler.handle_message_with(msg, Some(tx.clone())).await {
            let _ = tx.send(response);
        }
    });

    StatusCode::ACCEPTED.into_response()
}

async fn handle_request(
    State(state): State<Arc<ServerState>>,
    AxumJson(body): AxumJson<Value>,
) -> Response {
    let msg: JsonRpcMessage = match serde_json::from_value(body) {
        Ok(msg) => msg,
        Err(e) => return rpc_error(StatusCode::BAD_REQUEST, McpError::InvalidRequest(e.to_string())),
    };

    match state.handler.handle_message(msg).await {
        Some(response) => AxumJson(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Health check; no auth required.
async fn handle_health(State(state): State<Arc<ServerState>>) -> AxumJson<Value> {
    AxumJson(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sensors": state.handler.session().registry().len(),
        "sessions": state.sessions().len(),
    }))
}
