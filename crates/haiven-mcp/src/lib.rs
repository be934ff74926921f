//! Model Context Protocol (MCP) primitives for the Haiven bridge.
//!
//! Scoped to the server side of the stdio transport: JSON-RPC framing types, the MCP
//! `initialize` handshake, and routing of the `tools/*` and `prompts/*` methods to an
//! [`McpHandler`].

mod jsonrpc;
mod server;
mod types;

pub use jsonrpc::{
    JsonRpcError, JsonRpcId, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};
pub use server::{McpConnection, McpHandler, McpServerConfig, PendingRequest, Routed};
pub use types::{
    CallToolParams, CallToolResult, ContentBlock, GetPromptParams, GetPromptResult,
    InitializeParams, InitializeResult, ListPromptsParams, ListPromptsResult, ListToolsParams,
    ListToolsResult, McpServerInfo, Prompt, PromptMessage, Tool,
};

/// Latest protocol version supported by this implementation.
pub const PROTOCOL_VERSION_LATEST: &str = "2025-11-25";

/// Older protocol versions still commonly sent by clients.
pub const PROTOCOL_VERSION_2025_06_18: &str = "2025-06-18";
pub const PROTOCOL_VERSION_2024_11_05: &str = "2024-11-05";
