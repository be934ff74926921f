use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use haiven_catalog::PromptCatalog;
use haiven_core::BridgeError;
use haiven_core::workflow::{
    ToolContext, WorkflowDocuments, WorkflowMode, WorkflowOutcome, WorkflowRequest,
    WorkflowSection,
};
use haiven_mcp::{
    CallToolParams, CallToolResult, ContentBlock, GetPromptParams, GetPromptResult, JsonRpcError,
    ListPromptsParams, ListPromptsResult, ListToolsParams, ListToolsResult, McpHandler, Prompt,
    PromptMessage, Tool,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

const TOOL_GET_PROMPTS: &str = "get_prompts";
const TOOL_GET_PROMPT_TEXT: &str = "get_prompt_text";
const TOOL_GET_CASPER_WORKFLOW: &str = "get_casper_workflow";

/// Routes MCP prompt and tool calls to the catalog cache and the workflow documents.
pub struct BridgeHandler {
    catalog: Arc<PromptCatalog>,
    workflows: WorkflowDocuments,
}

impl BridgeHandler {
    pub fn new(catalog: Arc<PromptCatalog>, workflows: WorkflowDocuments) -> Self {
        Self { catalog, workflows }
    }

    async fn get_prompts(&self) -> Result<CallToolResult, JsonRpcError> {
        let snap = self.catalog.get_summaries(false).await?;
        let body = json!({
            "prompts": snap.summaries(),
            "total_count": snap.len(),
        });
        Ok(CallToolResult::text(pretty(&body)?))
    }

    async fn get_prompt_text(&self, args: Option<Value>) -> Result<CallToolResult, JsonRpcError> {
        let args: PromptTextArgs = tool_args(args)?;
        let prompt_id = args.prompt_id.unwrap_or_default();
        if prompt_id.trim().is_empty() {
            return Err(BridgeError::Protocol("prompt_id is required".to_string()).into());
        }
        let content = self.catalog.get_content(&prompt_id).await?;
        Ok(CallToolResult::text(pretty(&content)?))
    }

    async fn get_casper_workflow(
        &self,
        args: Option<Value>,
    ) -> Result<CallToolResult, JsonRpcError> {
        let args: WorkflowArgs = tool_args(args)?;
        let req = WorkflowRequest {
            section: args
                .section
                .as_deref()
                .map_or(Ok(WorkflowSection::Full), WorkflowSection::parse)?,
            mode: args
                .mode
                .as_deref()
                .map_or(Ok(WorkflowMode::default()), WorkflowMode::parse)?,
            tool_context: args.tool_context.as_deref().map(ToolContext::parse).transpose()?,
            project_directory: args
                .project_directory
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };

        let mode = req.mode;
        let outcome = match mode {
            WorkflowMode::Share => self.workflows.get(&req)?,
            WorkflowMode::Save => {
                let docs = self.workflows.clone();
                tokio::task::spawn_blocking(move || docs.get(&req))
                    .await
                    .map_err(|e| JsonRpcError::internal(format!("workflow save task: {e}")))??
            }
        };

        let sections: Vec<&str> = WorkflowSection::ALL.iter().map(|s| s.as_str()).collect();
        let body = match outcome {
            WorkflowOutcome::Shared { section, content } => json!({
                "tool": TOOL_GET_CASPER_WORKFLOW,
                "mode": WorkflowMode::Share.as_str(),
                "section": section.as_str(),
                "content": content,
                "usage": "This content provides the Casper workflow methodology for AI \
                          development guidance. Use it as rules/instructions for development \
                          processes.",
                "sections_available": sections,
            }),
            WorkflowOutcome::Saved(saved) => {
                let file_path = saved.path.display().to_string();
                json!({
                    "tool": TOOL_GET_CASPER_WORKFLOW,
                    "mode": WorkflowMode::Save.as_str(),
                    "section": saved.section.as_str(),
                    "tool_context": saved.tool_context.as_str(),
                    "file_path": file_path,
                    "content_preview": saved.content_preview,
                    "status": "success",
                    "usage": format!(
                        "Casper workflow saved to {file_path}. The file is now available as \
                         rules/instructions for your AI tool."
                    ),
                    "sections_available": sections,
                })
            }
        };
        Ok(CallToolResult::text(pretty(&body)?))
    }
}

#[derive(Debug, Default, Deserialize)]
struct PromptTextArgs {
    prompt_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowArgs {
    section: Option<String>,
    mode: Option<String>,
    tool_context: Option<String>,
    project_directory: Option<String>,
}

fn tool_args<T: DeserializeOwned + Default>(args: Option<Value>) -> Result<T, BridgeError> {
    match args {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v)
            .map_err(|e| BridgeError::Protocol(format!("invalid tool arguments: {e}"))),
    }
}

fn pretty<T: serde::Serialize>(v: &T) -> Result<String, JsonRpcError> {
    serde_json::to_string_pretty(v).map_err(|e| JsonRpcError::internal(e.to_string()))
}

fn tool_definitions() -> Vec<Tool> {
    let sections: Vec<&str> = WorkflowSection::ALL.iter().map(|s| s.as_str()).collect();
    let contexts: Vec<&str> = ToolContext::ALL.iter().map(|c| c.as_str()).collect();
    vec![
        Tool {
            name: TOOL_GET_PROMPTS.to_string(),
            title: Some("List Haiven prompts".to_string()),
            description: Some(
                "Get all available prompts with their metadata and follow-ups".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: TOOL_GET_PROMPT_TEXT.to_string(),
            title: Some("Get prompt text".to_string()),
            description: Some("Get the prompt text content by prompt ID".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "prompt_id": {
                        "type": "string",
                        "description": "ID of the prompt to retrieve text for"
                    }
                },
                "required": ["prompt_id"]
            }),
        },
        Tool {
            name: TOOL_GET_CASPER_WORKFLOW.to_string(),
            title: Some("Casper workflow".to_string()),
            description: Some(
                "Get or save the Casper workflow methodology as rules/instructions for AI \
                 development guidance. Supports two modes: 'share' (returns content to LLM) or \
                 'save' (saves to appropriate tool directory like .cursor/rules or \
                 .github/instructions)"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "section": {
                        "type": "string",
                        "description": "Optional section to retrieve (explore, craft, polish, or full). Defaults to 'full'.",
                        "enum": sections
                    },
                    "mode": {
                        "type": "string",
                        "description": "Mode of operation: 'share' returns content to LLM, 'save' saves to appropriate directory. Defaults to 'share'.",
                        "enum": ["share", "save"]
                    },
                    "tool_context": {
                        "type": "string",
                        "description": "Optional tool context for save mode to determine target directory. Auto-detected if not provided.",
                        "enum": contexts
                    },
                    "project_directory": {
                        "type": "string",
                        "description": "Optional project directory path. Files are saved relative to it instead of the current working directory."
                    }
                },
                "required": []
            }),
        },
    ]
}

#[async_trait]
impl McpHandler for BridgeHandler {
    async fn list_tools(&self, _params: ListToolsParams) -> Result<ListToolsResult, JsonRpcError> {
        // Surfaces a catalog outage here instead of at the first tool call.
        self.catalog.get_summaries(false).await?;
        Ok(ListToolsResult {
            tools: tool_definitions(),
            next_cursor: None,
        })
    }

    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, JsonRpcError> {
        debug!(tool = %params.name, "call_tool");
        match params.name.as_str() {
            TOOL_GET_PROMPTS => self.get_prompts().await,
            TOOL_GET_PROMPT_TEXT => self.get_prompt_text(params.arguments).await,
            TOOL_GET_CASPER_WORKFLOW => self.get_casper_workflow(params.arguments).await,
            other => Err(JsonRpcError::invalid_params(format!("unknown tool '{other}'"))),
        }
    }

    async fn list_prompts(
        &self,
        _params: ListPromptsParams,
    ) -> Result<ListPromptsResult, JsonRpcError> {
        let snap = self.catalog.get_summaries(false).await?;
        let prompts = snap
            .descriptors()
            .iter()
            .map(|d| Prompt {
                name: d.name.clone(),
                title: Some(d.title.clone()),
                description: Some(d.description.clone()),
            })
            .collect();
        Ok(ListPromptsResult {
            prompts,
            next_cursor: None,
        })
    }

    async fn get_prompt(&self, params: GetPromptParams) -> Result<GetPromptResult, JsonRpcError> {
        let content = self.catalog.get_content(&params.name).await?;
        let snap = self.catalog.get_summaries(false).await?;
        Ok(GetPromptResult {
            description: snap.describe(&params.name).map(str::to_string),
            messages: vec![PromptMessage {
                role: "assistant".to_string(),
                content: ContentBlock::text(content.content),
            }],
        })
    }
}
