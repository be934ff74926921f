//! Core types shared across the Haiven MCP bridge workspace.
//!
//! Kept free of HTTP and protocol dependencies so the gateway, the catalog cache, and the
//! server binary can all share one error taxonomy and one data model.

pub mod error;
pub mod sensitive;
pub mod source;
pub mod types;
pub mod util;
pub mod workflow;

pub use error::{BridgeError, ErrorKind};
pub use sensitive::Sensitive;
pub use source::PromptSource;
pub use types::*;
