use async_trait::async_trait;

use crate::{BridgeError, PromptContent, PromptSummary};

/// Where prompt data comes from. Implemented by the HTTP gateway; tests substitute fakes.
#[async_trait]
pub trait PromptSource: Send + Sync {
    async fn fetch_summaries(&self) -> Result<Vec<PromptSummary>, BridgeError>;
    async fn fetch_content(&self, prompt_id: &str) -> Result<PromptContent, BridgeError>;
}
