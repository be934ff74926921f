//! Stdio MCP server bridging AI assistants to a Haiven deployment.

pub mod config;
pub mod handler;
mod stdio;

pub use config::Settings;
pub use handler::BridgeHandler;
pub use stdio::run_stdio;

use haiven_mcp::McpServerConfig;

pub const SERVER_NAME: &str = "haiven-mcp-server";

pub fn server_config() -> McpServerConfig {
    let mut cfg = McpServerConfig::default_for_binary(SERVER_NAME, env!("CARGO_PKG_VERSION"));
    cfg.instructions = Some(
        "Haiven prompts are exposed as MCP prompts and through the get_prompts and \
         get_prompt_text tools. get_casper_workflow returns or saves the Casper \
         development workflow."
            .to_string(),
    );
    cfg
}
