//! In-memory view of the upstream prompt catalog.
//!
//! [`PromptCatalog`] owns two TTL tiers (the summary list and per-prompt content) in front of a
//! [`haiven_core::PromptSource`]. Each successful list refresh produces an immutable
//! [`CatalogSnapshot`] that doubles as the MCP prompt registry.

mod cache;
mod snapshot;

pub use cache::{CatalogConfig, PromptCatalog};
pub use snapshot::{CatalogSnapshot, PromptDescriptor};
