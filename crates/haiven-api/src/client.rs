use std::time::Duration;

use async_trait::async_trait;
use haiven_core::util::excerpt;
use haiven_core::{BridgeError, PromptContent, PromptSource, PromptSummary};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderValue, LOCATION};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AuthConfig, build_headers};
use crate::wire::{ContentPayload, SummaryWire, into_summaries};

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct HaivenClientOptions {
    pub base_url: Url,
    pub auth: AuthConfig,
    pub timeout: Duration,
}

impl HaivenClientOptions {
    pub fn new(base_url: Url, auth: AuthConfig) -> Self {
        Self {
            base_url,
            auth,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Stateless client for `GET /api/prompts` and `GET /api/prompts/{id}`.
#[derive(Debug, Clone)]
pub struct HaivenClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HaivenClient {
    pub fn new(opts: HaivenClientOptions) -> Result<Self, BridgeError> {
        let mut base_url = opts.base_url;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(BridgeError::Config(format!(
                "HAIVEN_API_URL must be an http(s) URL, got '{base_url}'"
            )));
        }
        base_url.set_query(None);
        base_url.set_fragment(None);

        let mut headers = build_headers(&opts.auth)?;
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(opts.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .user_agent(concat!("haiven-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::Config(format!("build http client: {e}")))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptSummary>, BridgeError> {
        let url = self.endpoint(&["api", "prompts"])?;
        let raw: Vec<SummaryWire> = self.get_json(url, "prompt catalog").await?;
        let total = raw.len();
        let prompts = into_summaries(raw);
        info!(
            count = prompts.len(),
            filtered = total - prompts.len(),
            "loaded prompt catalog"
        );
        Ok(prompts)
    }

    pub async fn get_prompt(&self, prompt_id: &str) -> Result<PromptContent, BridgeError> {
        let url = self.endpoint(&["api", "prompts", prompt_id])?;
        let subject = format!("prompt '{prompt_id}'");
        let payload: ContentPayload = self.get_json(url, &subject).await?;
        let content = payload
            .into_content(prompt_id)
            .ok_or(BridgeError::NotFound(subject))?;
        debug!(prompt_id = %prompt_id, "fetched prompt content");
        Ok(content)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BridgeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BridgeError::Config("HAIVEN_API_URL cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        subject: &str,
    ) -> Result<T, BridgeError> {
        let resp = self.send(&url).await?;
        let status = resp.status();

        if status.is_redirection() {
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string);
            return Err(self.classify_redirect(status, &url, location.as_deref()));
        }

        let body = resp.bytes().await.map_err(|e| {
            BridgeError::UpstreamUnavailable(format!("read {subject} response: {e}"))
        })?;

        if !status.is_success() {
            let err = classify_status(status, &body, subject);
            warn!(status = status.as_u16(), url = %url, error = %err, "upstream request failed");
            return Err(err);
        }

        serde_json::from_slice(&body)
            .map_err(|e| BridgeError::Protocol(format!("malformed {subject} response: {e}")))
    }

    /// One immediate retry, and only when the connection could not be established.
    async fn send(&self, url: &Url) -> Result<reqwest::Response, BridgeError> {
        let mut retried = false;
        loop {
            match self.http.get(url.clone()).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_connect() && !e.is_timeout() && !retried => {
                    debug!(url = %url, error = %e, "connect failed; retrying once");
                    retried = true;
                }
                Err(e) => {
                    let err = if e.is_timeout() {
                        BridgeError::UpstreamUnavailable(format!("request to {url} timed out"))
                    } else {
                        BridgeError::UpstreamUnavailable(e.without_url().to_string())
                    };
                    warn!(url = %url, error = %err, "upstream unreachable");
                    return Err(err);
                }
            }
        }
    }

    /// Redirects that leave the API path are the login page bouncing an unauthenticated call.
    fn classify_redirect(
        &self,
        status: StatusCode,
        from: &Url,
        location: Option<&str>,
    ) -> BridgeError {
        let api_prefix = match self.endpoint(&["api", ""]) {
            Ok(u) => u.path().to_string(),
            Err(e) => return e,
        };
        let target = location.and_then(|l| from.join(l).ok());
        match target {
            Some(t) if t.origin() == from.origin() && t.path().starts_with(&api_prefix) => {
                BridgeError::Upstream {
                    status: status.as_u16(),
                    excerpt: format!("unexpected redirect to {}", t.path()),
                }
            }
            _ => BridgeError::Auth(format!(
                "upstream redirected to {} (login required?)",
                location.unwrap_or("<no location>")
            )),
        }
    }
}

fn classify_status(status: StatusCode, body: &[u8], subject: &str) -> BridgeError {
    match status.as_u16() {
        401 | 403 => BridgeError::Auth(format!("upstream returned {status} for {subject}")),
        404 => BridgeError::NotFound(subject.to_string()),
        500..=599 => BridgeError::UpstreamUnavailable(format!("upstream returned {status}")),
        code => BridgeError::Upstream {
            status: code,
            excerpt: excerpt(&String::from_utf8_lossy(body), BODY_EXCERPT_CHARS),
        },
    }
}

#[async_trait]
impl PromptSource for HaivenClient {
    async fn fetch_summaries(&self) -> Result<Vec<PromptSummary>, BridgeError> {
        self.list_prompts().await
    }

    async fn fetch_content(&self, prompt_id: &str) -> Result<PromptContent, BridgeError> {
        self.get_prompt(prompt_id).await
    }
}
