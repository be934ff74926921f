use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use haiven_api::HaivenClient;
use haiven_catalog::PromptCatalog;
use haiven_core::workflow::WorkflowDocuments;
use haiven_mcp::McpConnection;
use haiven_mcp_server::{BridgeHandler, Settings, run_stdio, server_config};
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries protocol frames only. Never log to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let settings = Settings::parse();
    let opts = settings.client_options().context("invalid configuration")?;
    info!(
        api_url = %opts.base_url,
        auth_mode = opts.auth.mode(),
        timeout_secs = opts.timeout.as_secs(),
        "starting haiven mcp server"
    );
    let client = HaivenClient::new(opts).context("invalid configuration")?;

    let catalog = Arc::new(PromptCatalog::new(
        Arc::new(client),
        settings.catalog_config(),
    ));
    // Load before accepting requests so the first prompts/list is usually a cache hit.
    catalog.warm().await;

    let cwd = std::env::current_dir().context("resolve working directory")?;
    let handler = BridgeHandler::new(catalog, WorkflowDocuments::new(cwd));
    let conn = McpConnection::new(server_config(), Arc::new(handler));

    run_stdio(conn, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("stdio loop")
}
