use std::time::Duration;

use clap::Parser;
use haiven_api::{AuthSettings, HaivenClientOptions, parse_flag};
use haiven_catalog::CatalogConfig;
use haiven_core::BridgeError;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "haiven-mcp-server",
    version,
    about = "MCP server for the Haiven prompt catalog (stdio transport)"
)]
pub struct Settings {
    /// Base URL of the Haiven deployment, e.g. `https://haiven.example.com`.
    #[arg(long, env = "HAIVEN_API_URL")]
    pub api_url: Option<String>,

    /// API key sent as a bearer token.
    #[arg(long, env = "HAIVEN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Browser session cookie value, used when no API key is set.
    #[arg(long, env = "HAIVEN_SESSION_COOKIE", hide_env_values = true)]
    pub session_cookie: Option<String>,

    /// Send no credentials (for deployments running without authentication).
    #[arg(
        long,
        env = "HAIVEN_DISABLE_AUTH",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = lenient_flag
    )]
    pub disable_auth: Option<bool>,

    /// Per-request timeout for upstream calls.
    #[arg(long, env = "HAIVEN_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,

    #[arg(long, env = "HAIVEN_SUMMARY_TTL_SECS", default_value_t = 300)]
    pub summary_ttl_secs: u64,

    #[arg(long, env = "HAIVEN_CONTENT_TTL_SECS", default_value_t = 3600)]
    pub content_ttl_secs: u64,

    /// How long past expiry cached data may be served while Haiven is unreachable.
    #[arg(long, env = "HAIVEN_STALE_GRACE_SECS", default_value_t = 900)]
    pub stale_grace_secs: u64,
}

fn lenient_flag(raw: &str) -> Result<bool, String> {
    Ok(parse_flag(raw))
}

impl Settings {
    pub fn api_url(&self) -> Result<Url, BridgeError> {
        let raw = self
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BridgeError::Config("HAIVEN_API_URL is required".to_string()))?;
        Url::parse(raw).map_err(|e| BridgeError::Config(format!("invalid HAIVEN_API_URL: {e}")))
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings::new(
            self.disable_auth.unwrap_or(false),
            self.api_key.clone(),
            self.session_cookie.clone(),
        )
    }

    pub fn client_options(&self) -> Result<HaivenClientOptions, BridgeError> {
        let mut opts = HaivenClientOptions::new(self.api_url()?, self.auth_settings().resolve());
        if self.http_timeout_secs == 0 {
            return Err(BridgeError::Config(
                "HAIVEN_HTTP_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        opts.timeout = Duration::from_secs(self.http_timeout_secs);
        Ok(opts)
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            summary_ttl: Duration::from_secs(self.summary_ttl_secs),
            content_ttl: Duration::from_secs(self.content_ttl_secs),
            stale_grace: Duration::from_secs(self.stale_grace_secs),
        }
    }
}
