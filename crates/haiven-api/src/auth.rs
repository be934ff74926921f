use haiven_core::{BridgeError, Sensitive};
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, HeaderValue};
use tracing::{info, warn};

/// Raw credential settings as supplied by the environment or command line.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    pub disable_auth: bool,
    pub api_key: Option<Sensitive<String>>,
    pub session_cookie: Option<Sensitive<String>>,
}

impl AuthSettings {
    /// Blank credentials are treated as absent.
    pub fn new(
        disable_auth: bool,
        api_key: Option<String>,
        session_cookie: Option<String>,
    ) -> Self {
        fn non_blank(v: Option<String>) -> Option<Sensitive<String>> {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(Sensitive::new)
        }
        Self {
            disable_auth,
            api_key: non_blank(api_key),
            session_cookie: non_blank(session_cookie),
        }
    }

    /// Pick exactly one credential mode. Precedence: explicit disable, API key, session cookie.
    pub fn resolve(&self) -> AuthConfig {
        let cfg = if self.disable_auth {
            AuthConfig::Disabled
        } else if let Some(key) = &self.api_key {
            AuthConfig::ApiKey(key.clone())
        } else if let Some(cookie) = &self.session_cookie {
            AuthConfig::SessionCookie(cookie.clone())
        } else {
            warn!("no credentials configured; upstream must run with authentication disabled");
            AuthConfig::Disabled
        };

        if self.disable_auth && (self.api_key.is_some() || self.session_cookie.is_some()) {
            warn!("authentication explicitly disabled; ignoring configured credentials");
        }
        info!(auth_mode = cfg.mode(), "resolved upstream authentication");
        cfg
    }
}

/// Accepts `1`, `true`, `yes`, and `on` in any case; everything else is false.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// The credential mode used for every upstream request of this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    Disabled,
    ApiKey(Sensitive<String>),
    SessionCookie(Sensitive<String>),
}

impl AuthConfig {
    pub fn mode(&self) -> &'static str {
        match self {
            AuthConfig::Disabled => "disabled",
            AuthConfig::ApiKey(_) => "api_key",
            AuthConfig::SessionCookie(_) => "session_cookie",
        }
    }
}

/// Headers to attach to every upstream request for `cfg`.
///
/// Fails only when a credential contains bytes that cannot appear in a header value.
pub fn build_headers(cfg: &AuthConfig) -> Result<HeaderMap, BridgeError> {
    let mut headers = HeaderMap::new();
    let (name, raw) = match cfg {
        AuthConfig::Disabled => return Ok(headers),
        AuthConfig::ApiKey(token) => (AUTHORIZATION, format!("Bearer {}", token.expose())),
        AuthConfig::SessionCookie(value) => (COOKIE, format!("session={}", value.expose())),
    };
    let mut value = HeaderValue::from_str(&raw).map_err(|_| {
        BridgeError::Config(format!(
            "{} credential contains characters not allowed in an HTTP header",
            cfg.mode()
        ))
    })?;
    value.set_sensitive(true);
    headers.insert(name, value);
    Ok(headers)
}
