use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::jsonrpc::{
    JSONRPC_VERSION, JsonRpcError, JsonRpcId, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse,
};
use crate::types::{
    CallToolParams, CallToolResult, GetPromptParams, GetPromptResult, InitializeParams,
    InitializeResult, ListPromptsParams, ListPromptsResult, ListToolsParams, ListToolsResult,
    McpServerInfo,
};
use crate::{PROTOCOL_VERSION_2024_11_05, PROTOCOL_VERSION_2025_06_18, PROTOCOL_VERSION_LATEST};

/// Application side of the connection. Errors are returned already shaped for the wire;
/// `haiven_core::BridgeError` converts with `?`.
#[async_trait]
pub trait McpHandler: Send + Sync {
    async fn list_tools(&self, params: ListToolsParams) -> Result<ListToolsResult, JsonRpcError>;
    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, JsonRpcError>;
    async fn list_prompts(
        &self,
        params: ListPromptsParams,
    ) -> Result<ListPromptsResult, JsonRpcError>;
    async fn get_prompt(&self, params: GetPromptParams) -> Result<GetPromptResult, JsonRpcError>;
}

#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub server_info: McpServerInfo,
    pub instructions: Option<String>,
    pub capabilities: Value,
    pub supported_protocol_versions: Vec<String>,
}

impl McpServerConfig {
    pub fn default_for_binary(name: &str, version: &str) -> Self {
        Self {
            server_info: McpServerInfo {
                name: name.to_string(),
                version: version.to_string(),
            },
            instructions: None,
            capabilities: serde_json::json!({
                "prompts": {
                    "listChanged": false
                },
                "tools": {
                    "listChanged": false
                }
            }),
            supported_protocol_versions: vec![
                PROTOCOL_VERSION_LATEST.to_string(),
                PROTOCOL_VERSION_2025_06_18.to_string(),
                PROTOCOL_VERSION_2024_11_05.to_string(),
            ],
        }
    }

    fn negotiate_protocol(&self, requested: &str) -> String {
        if self
            .supported_protocol_versions
            .iter()
            .any(|v| v == requested)
        {
            requested.to_string()
        } else {
            PROTOCOL_VERSION_LATEST.to_string()
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ConnState {
    New,
    InitResponded,
    Ready,
    ShuttingDown,
}

/// What the transport should do with one inbound message.
pub enum Routed {
    /// Answer immediately, in read order.
    Reply(JsonRpcResponse),
    /// Handler work; may run concurrently with later messages.
    Dispatch(PendingRequest),
    /// Notifications and stray responses.
    Ignore,
}

enum Call {
    ListTools(ListToolsParams),
    CallTool(CallToolParams),
    ListPrompts(ListPromptsParams),
    GetPrompt(GetPromptParams),
}

/// A validated Ready-state request, detached from the connection so it can be spawned.
pub struct PendingRequest {
    id: JsonRpcId,
    method: String,
    call: Call,
    handler: Arc<dyn McpHandler>,
}

impl PendingRequest {
    pub fn id(&self) -> &JsonRpcId {
        &self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub async fn run(self) -> JsonRpcResponse {
        let h = self.handler;
        let result = match self.call {
            Call::ListTools(p) => h.list_tools(p).await.and_then(to_value),
            Call::CallTool(p) => h.call_tool(p).await.and_then(to_value),
            Call::ListPrompts(p) => h.list_prompts(p).await.and_then(to_value),
            Call::GetPrompt(p) => h.get_prompt(p).await.and_then(to_value),
        };
        match result {
            Ok(v) => JsonRpcResponse::ok(self.id, v),
            Err(e) => {
                warn!(
                    method = %self.method,
                    id = %self.id,
                    code = e.code,
                    kind = e.kind().unwrap_or_default(),
                    error = %e.message,
                    "request failed"
                );
                JsonRpcResponse::err(self.id, e)
            }
        }
    }
}

fn to_value<T: Serialize>(v: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(v).map_err(|e| JsonRpcError::internal(e.to_string()))
}

/// Absent or `null` params mean defaults.
fn optional_params<T: DeserializeOwned + Default>(p: Option<Value>) -> Result<T, JsonRpcError> {
    match p {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => {
            serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
        }
    }
}

fn required_params<T: DeserializeOwned>(p: Option<Value>) -> Result<T, JsonRpcError> {
    let Some(v) = p else {
        return Err(JsonRpcError::invalid_params("missing params"));
    };
    serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

/// MCP server connection state machine (lifecycle enforcement + method routing).
pub struct McpConnection {
    cfg: McpServerConfig,
    handler: Arc<dyn McpHandler>,
    state: ConnState,
    protocol_version: Option<String>,
}

impl McpConnection {
    pub fn new(cfg: McpServerConfig, handler: Arc<dyn McpHandler>) -> Self {
        Self {
            cfg,
            handler,
            state: ConnState::New,
            protocol_version: None,
        }
    }

    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// True once a `shutdown` request has been accepted.
    pub fn is_shutting_down(&self) -> bool {
        self.state == ConnState::ShuttingDown
    }

    /// Handle a single message to completion, running any handler call inline.
    ///
    /// Returns `Some(response)` for requests, `None` for notifications or ignored messages.
    pub async fn handle_message(&mut self, msg: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match self.route(msg) {
            Routed::Reply(resp) => Some(resp),
            Routed::Dispatch(pending) => Some(pending.run().await),
            Routed::Ignore => None,
        }
    }

    /// Apply lifecycle transitions and decide how `msg` is answered.
    pub fn route(&mut self, msg: JsonRpcMessage) -> Routed {
        match msg {
            JsonRpcMessage::Request(req) => {
                let id = req.id.clone();
                match self.route_request(req) {
                    Ok(routed) => routed,
                    Err(e) => Routed::Reply(JsonRpcResponse::err(id, e)),
                }
            }
            JsonRpcMessage::Notification(n) => {
                self.handle_notification(n);
                Routed::Ignore
            }
            JsonRpcMessage::Response(_) => Routed::Ignore,
        }
    }

    fn route_request(&mut self, req: JsonRpcRequest) -> Result<Routed, JsonRpcError> {
        if req.jsonrpc != JSONRPC_VERSION {
            return Err(JsonRpcError::invalid_request(
                "invalid jsonrpc version",
                Some(req.jsonrpc),
            ));
        }
        if self.state == ConnState::ShuttingDown {
            return Err(JsonRpcError::invalid_request("server is shutting down", None));
        }

        let call = match req.method.as_str() {
            "initialize" => return self.handle_initialize(req).map(Routed::Reply),
            // Allowed in any state.
            "ping" => {
                return Ok(Routed::Reply(JsonRpcResponse::ok(
                    req.id,
                    serde_json::json!({}),
                )));
            }
            "shutdown" | "tools/list" | "tools/call" | "prompts/list" | "prompts/get"
                if self.state != ConnState::Ready =>
            {
                return Err(JsonRpcError::not_initialized());
            }
            "shutdown" => {
                info!("shutdown requested");
                self.state = ConnState::ShuttingDown;
                return Ok(Routed::Reply(JsonRpcResponse::ok(
                    req.id,
                    serde_json::json!({}),
                )));
            }
            "tools/list" => Call::ListTools(optional_params(req.params)?),
            "tools/call" => Call::CallTool(required_params(req.params)?),
            "prompts/list" => Call::ListPrompts(optional_params(req.params)?),
            "prompts/get" => Call::GetPrompt(required_params(req.params)?),
            other => return Err(JsonRpcError::method_not_found(other)),
        };

        Ok(Routed::Dispatch(PendingRequest {
            id: req.id,
            method: req.method,
            call,
            handler: self.handler.clone(),
        }))
    }

    fn handle_initialize(
        &mut self,
        req: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ConnState::New {
            return Err(JsonRpcError::invalid_request("already initialized", None));
        }

        let init: InitializeParams = required_params(req.params)?;
        let negotiated = self.cfg.negotiate_protocol(&init.protocol_version);
        info!(
            client = %init.client_info.name,
            client_version = %init.client_info.version,
            requested = %init.protocol_version,
            negotiated = %negotiated,
            "initialize"
        );
        self.protocol_version = Some(negotiated.clone());
        self.state = ConnState::InitResponded;

        let result = InitializeResult {
            protocol_version: negotiated,
            capabilities: self.cfg.capabilities.clone(),
            server_info: self.cfg.server_info.clone(),
            instructions: self.cfg.instructions.clone(),
        };

        Ok(JsonRpcResponse::ok(req.id, to_value(result)?))
    }

    fn handle_notification(&mut self, n: JsonRpcNotification) {
        if n.jsonrpc != JSONRPC_VERSION {
            return;
        }

        if n.method.as_str() == "notifications/initialized"
            && self.state == ConnState::InitResponded
        {
            self.state = ConnState::Ready;
        } else {
            debug!(method = %n.method, "ignoring notification");
        }
    }

    pub fn make_initialized_notification() -> JsonRpcNotification {
        JsonRpcNotification::new("notifications/initialized", None)
    }
}
