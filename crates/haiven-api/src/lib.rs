//! Haiven prompts API: credential resolution and a small typed client.
//!
//! The client maps every transport and status outcome onto [`haiven_core::BridgeError`] so the
//! catalog cache and the MCP server never see raw HTTP errors.

pub mod auth;
pub mod client;
mod wire;

pub use auth::{AuthConfig, AuthSettings, build_headers, parse_flag};
pub use client::{DEFAULT_TIMEOUT, HaivenClient, HaivenClientOptions};
