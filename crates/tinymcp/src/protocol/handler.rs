//! Request dispatcher. Receives JSON-RPC messages and routes them to handlers.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::{Context, NotificationSink};
use crate::server::McpServer;
use crate::types::*;

use super::codec::{self, params_object};
use super::negotiation::{LifecycleState, NegotiatedCapabilities};

/// Methods that are fine to receive before the handshake completes.
const HANDSHAKE_METHODS: &[&str] = &[
    "initialize",
    "initialized",
    "notifications/initialized",
    "ping",
];

/// Turns parsed messages into replies for one client connection.
///
/// Transports call [`handle_raw_with`](Self::handle_raw_with) with each
/// inbound payload and the sink that server-to-client notifications for
/// that payload should go to.
pub struct ProtocolHandler {
    server: Arc<McpServer>,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
}

impl ProtocolHandler {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self {
            server,
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
        }
    }

    pub fn server(&self) -> &Arc<McpServer> {
        &self.server
    }

    pub async fn state(&self) -> LifecycleState {
        self.capabilities.lock().await.state
    }

    pub async fn handle_raw(&self, raw: &str) -> Option<String> {
        self.handle_raw_with(raw, None).await
    }

    /// Byte-level entry point. `None` means nothing goes back on the wire.
    pub async fn handle_raw_with(&self, raw: &str, sink: Option<NotificationSink>) -> Option<String> {
        let outgoing = match codec::parse_message(raw) {
            Ok(incoming) => self.handle_incoming(incoming, sink).await?,
            Err(e) => {
                tracing::warn!("Rejected inbound payload: {e} ({})", e.data().unwrap_or_default());
                Outgoing::Single(JsonRpcReply::Failure(e.to_json_rpc_error(RequestId::Null)))
            }
        };

        match codec::serialize(&outgoing) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!("Failed to serialize reply: {e}");
                None
            }
        }
    }

    /// Batches are processed in order; an empty reply set yields `None`.
    pub async fn handle_incoming(
        &self,
        incoming: Incoming,
        sink: Option<NotificationSink>,
    ) -> Option<Outgoing> {
        match incoming {
            Incoming::Single(msg) => self.handle_message(msg, sink).await.map(Outgoing::Single),
            Incoming::Batch(entries) => {
                tracing::debug!("Processing batch of {} messages", entries.len());
                let mut replies = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry {
                        Ok(msg) => {
                            if let Some(reply) = self.handle_message(msg, sink.clone()).await {
                                replies.push(reply);
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Invalid batch entry: {}", e.data().unwrap_or_default());
                            replies.push(JsonRpcReply::Failure(e.to_json_rpc_error(RequestId::Null)));
                        }
                    }
                }
                (!replies.is_empty()).then_some(Outgoing::Batch(replies))
            }
        }
    }

    pub async fn handle_message(
        &self,
        msg: JsonRpcMessage,
        sink: Option<NotificationSink>,
    ) -> Option<JsonRpcReply> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req, sink).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif, sink).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest, sink: Option<NotificationSink>) -> JsonRpcReply {
        tracing::debug!(id = %request.id, "-> {}", request.method);
        let id = request.id.clone();
        match self
            .dispatch(&request.method, request.params, Some(id.clone()), sink)
            .await
        {
            Ok(result) => JsonRpcReply::Success(JsonRpcResponse::new(id, result)),
            Err(e) => {
                tracing::debug!(id = %id, "<- error {}: {e}", e.code());
                JsonRpcReply::Failure(e.to_json_rpc_error(id))
            }
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification, sink: Option<NotificationSink>) {
        tracing::debug!("-> {} (notification)", notification.method);
        let method = notification.method;
        match self.dispatch(&method, notification.params, None, sink).await {
            Ok(_) => {}
            Err(McpError::MethodNotFound(_)) => {
                tracing::debug!("Unknown notification: {method}");
            }
            Err(e) => tracing::debug!("Notification {method} failed: {e}"),
        }
    }

    /// One table for requests and notifications; `id` is `None` for the latter.
    async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
        id: Option<RequestId>,
        sink: Option<NotificationSink>,
    ) -> McpResult<Value> {
        if !HANDSHAKE_METHODS.contains(&method) && !method.starts_with("notifications/") {
            let state = self.state().await;
            if state != LifecycleState::Ready {
                tracing::warn!("'{method}' received before handshake completed ({state:?})");
            }
        }

        match method {
            "initialize" => self.handle_initialize(params).await,
            "initialized" | "notifications/initialized" => {
                self.capabilities.lock().await.mark_initialized();
                Ok(Value::Null)
            }
            "notifications/cancelled" => {
                let reason = params
                    .and_then(|p| serde_json::from_value::<CancelRequestParams>(p).ok())
                    .map(|c| format!("{} ({})", c.request_id, c.reason.unwrap_or_default()));
                tracing::info!("Cancellation requested for {}", reason.as_deref().unwrap_or("unknown request"));
                Ok(Value::Null)
            }
            "ping" => Ok(Value::Object(serde_json::Map::new())),

            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(params, id, sink).await,

            "resources/list" => self.handle_resources_list(),
            "resources/templates/list" => self.handle_resource_templates_list(),
            "resources/read" => self.handle_resources_read(params).await,

            "prompts/list" => self.handle_prompts_list(),
            "prompts/get" => self.handle_prompts_get(params).await,

            _ => Err(McpError::MethodNotFound(method.to_string())),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = match params {
            None => InitializeParams::default(),
            Some(p) => serde_json::from_value(p).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed initialize params: {e}");
                InitializeParams::default()
            }),
        };

        self.capabilities.lock().await.negotiate(init_params);

        to_result(InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: self.server.capabilities(),
            server_info: self.server.server_info(),
            instructions: self.server.instructions().map(str::to_string),
        })
    }

    fn handle_tools_list(&self) -> McpResult<Value> {
        to_result(ToolListResult {
            tools: self.server.tools().list_tools(),
            next_cursor: None,
        })
    }

    async fn handle_tools_call(
        &self,
        params: Option<Value>,
        id: Option<RequestId>,
        sink: Option<NotificationSink>,
    ) -> McpResult<Value> {
        let call: ToolCallParams = typed_params(params)?;
        let name = call.name.ok_or_else(|| missing("name"))?;

        let ctx = Context::new(id, self.server.name())
            .with_progress_token(call.meta.and_then(|m| m.progress_token))
            .with_sink(sink);
        let result = self.server.tools().invoke(&name, call.arguments, ctx).await?;
        to_result(result)
    }

    fn handle_resources_list(&self) -> McpResult<Value> {
        to_result(ResourceListResult {
            resources: self.server.resources().list_resources(),
            next_cursor: None,
        })
    }

    fn handle_resource_templates_list(&self) -> McpResult<Value> {
        to_result(ResourceTemplateListResult {
            resource_templates: self.server.resources().list_templates(),
            next_cursor: None,
        })
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> McpResult<Value> {
        let read: ResourceReadParams = typed_params(params)?;
        let uri = read.uri.ok_or_else(|| missing("uri"))?;
        to_result(self.server.resources().read(&uri).await?)
    }

    fn handle_prompts_list(&self) -> McpResult<Value> {
        to_result(PromptListResult {
            prompts: self.server.prompts().list_prompts(),
            next_cursor: None,
        })
    }

    async fn handle_prompts_get(&self, params: Option<Value>) -> McpResult<Value> {
        let get: PromptGetParams = typed_params(params)?;
        let name = get.name.ok_or_else(|| missing("name"))?;
        to_result(self.server.prompts().get(&name, get.arguments).await?)
    }
}

fn typed_params<T: DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    let obj = params_object(params)?;
    serde_json::from_value(Value::Object(obj)).map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn missing(field: &str) -> McpError {
    McpError::InvalidParams(format!("Missing required parameter: '{field}'"))
}

fn to_result<T: Serialize>(value: T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}
