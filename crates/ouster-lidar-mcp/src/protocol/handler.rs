//! Main request dispatcher: receives JSON-RPC messages and routes them to handlers.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::prompts::PromptRegistry;
use crate::resources::ResourceRegistry;
use crate::session::LidarSession;
use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::progress::{NotificationSink, Progress};
use super::validator::validate_request;

/// Dispatches incoming JSON-RPC messages. Safe to share across tasks.
pub struct ProtocolHandler {
    session: Arc<LidarSession>,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
}

impl ProtocolHandler {
    pub fn new(session: Arc<LidarSession>) -> Self {
        Self {
            session,
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
        }
    }

    pub fn session(&self) -> &Arc<LidarSession> {
        &self.session
    }

    /// Handle one message; returns the response for requests, `None` otherwise.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        self.handle_message_with(msg, None).await
    }

    /// Like [`handle_message`](Self::handle_message), with a channel for
    /// notifications sent while the request runs.
    pub async fn handle_message_with(
        &self,
        msg: JsonRpcMessage,
        notifications: Option<NotificationSink>,
    ) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req, notifications).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest, notifications: Option<NotificationSink>) -> Value {
        if let Err(e) = validate_request(&request) {
            return serde_json::to_value(e.to_json_rpc_error(request.id)).unwrap_or_default();
        }

        let id = request.id.clone();
        tracing::debug!("Request {id}: {}", request.method);

        match self.dispatch_request(&request, notifications).await {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id, value)).unwrap_or_default(),
            Err(e) => {
                tracing::debug!("Request {id} failed: {e}");
                serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default()
            }
        }
    }

    async fn dispatch_request(
        &self,
        request: &JsonRpcRequest,
        notifications: Option<NotificationSink>,
    ) -> McpResult<Value> {
        let params = request.params.clone();
        match request.method.as_str() {
            "initialize" => self.handle_initialize(params).await,
            "shutdown" => self.handle_shutdown().await,

            "tools/list" => to_result(ToolListResult {
                tools: ToolRegistry::list_tools(),
                next_cursor: None,
            }),
            "tools/call" => self.handle_tools_call(params, notifications).await,

            "resources/list" => to_result(ResourceListResult {
                resources: ResourceRegistry::list_resources(),
                next_cursor: None,
            }),
            "resources/templates/list" => to_result(ResourceTemplateListResult {
                resource_templates: ResourceRegistry::list_templates(),
                next_cursor: None,
            }),
            "resources/read" => self.handle_resources_read(params).await,

            "prompts/list" => to_result(PromptListResult {
                prompts: PromptRegistry::list_prompts(),
                next_cursor: None,
            }),
            "prompts/get" => self.handle_prompts_get(params).await,

            "ping" => Ok(Value::Object(serde_json::Map::new())),

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.capabilities.lock().await.mark_initialized();
            }
            "notifications/cancelled" => {
                tracing::info!("Received cancellation notification");
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = required_params(params, "Initialize")?;
        let result = self.capabilities.lock().await.negotiate(init_params);
        to_result(result)
    }

    async fn handle_shutdown(&self) -> McpResult<Value> {
        tracing::info!("Shutdown requested");
        self.session.shutdown().await;
        Ok(Value::Object(serde_json::Map::new()))
    }

    async fn handle_tools_call(
        &self,
        params: Option<Value>,
        notifications: Option<NotificationSink>,
    ) -> McpResult<Value> {
        let call_params: ToolCallParams = required_params(params, "Tool call")?;
        let progress = Progress::new(call_params.progress_token(), notifications);
        let result =
            ToolRegistry::call(&call_params.name, call_params.arguments, &self.session, &progress).await?;
        to_result(result)
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> McpResult<Value> {
        let read_params: ResourceReadParams = required_params(params, "Resource read")?;
        let result = ResourceRegistry::read(&read_params.uri, &self.session).await?;
        to_result(result)
    }

    async fn handle_prompts_get(&self, params: Option<Value>) -> McpResult<Value> {
        let get_params: PromptGetParams = required_params(params, "Prompt get")?;
        let result = PromptRegistry::get(&get_params.name, get_params.arguments).await?;
        to_result(result)
    }
}

fn required_params<T: DeserializeOwned>(params: Option<Value>, what: &str) -> McpResult<T> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams(format!("{what} params required")))
}

fn to_result(value: impl Serialize) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}
