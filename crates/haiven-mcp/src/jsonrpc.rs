use haiven_core::{BridgeError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
    Null,
}

impl std::fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonRpcId::Number(n) => write!(f, "{n}"),
            JsonRpcId::String(s) => f.write_str(s),
            JsonRpcId::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: JsonRpcId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: JsonRpcId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: JsonRpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn ok(id: JsonRpcId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: JsonRpcId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error object. `data.kind` always names the bridge error taxonomy entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn protocol(code: i64, message: &str, detail: Option<String>) -> Self {
        let mut data = serde_json::json!({ "kind": ErrorKind::Protocol.as_str() });
        if let Some(detail) = detail {
            data["detail"] = Value::String(detail);
        }
        Self {
            code,
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::protocol(-32700, "parse error", Some(detail.into()))
    }

    pub fn invalid_request(message: &str, detail: Option<String>) -> Self {
        Self::protocol(-32600, message, detail)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::protocol(-32601, "method not found", Some(method.to_string()))
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::protocol(-32602, "invalid params", Some(detail.into()))
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::protocol(-32603, "internal error", Some(detail.into()))
    }

    pub fn not_initialized() -> Self {
        Self::protocol(-32002, "not initialized", None)
    }

    /// The taxonomy kind carried in `data.kind`, if any.
    pub fn kind(&self) -> Option<&str> {
        self.data.as_ref()?.get("kind")?.as_str()
    }
}

impl From<BridgeError> for JsonRpcError {
    fn from(e: BridgeError) -> Self {
        let kind = e.kind();
        let mut data = serde_json::json!({ "kind": kind.as_str() });
        match &e {
            BridgeError::Upstream { status, excerpt } => {
                data["status"] = (*status).into();
                data["excerpt"] = Value::String(excerpt.clone());
            }
            BridgeError::Io { path, .. } => {
                data["path"] = Value::String(path.display().to_string());
            }
            _ => {}
        }
        Self {
            code: kind.code(),
            message: e.to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}
