use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Every failure the bridge can surface, grouped by how a client should react to it.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("upstream rejected credentials: {0}")]
    Auth(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("upstream error {status}: {excerpt}")]
    Upstream { status: u16, excerpt: String },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("failed to write {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Auth,
    NotFound,
    UpstreamUnavailable,
    Upstream,
    Protocol,
    Io,
}

impl ErrorKind {
    /// Stable name reported to clients in `error.data.kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "ConfigError",
            ErrorKind::Auth => "AuthError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
            ErrorKind::Upstream => "UpstreamError",
            ErrorKind::Protocol => "ProtocolError",
            ErrorKind::Io => "IOError",
        }
    }

    /// Stable JSON-RPC error code for this kind.
    pub fn code(self) -> i64 {
        match self {
            ErrorKind::Config => -32010,
            ErrorKind::Auth => -32011,
            ErrorKind::NotFound => -32012,
            ErrorKind::UpstreamUnavailable => -32013,
            ErrorKind::Upstream => -32014,
            ErrorKind::Protocol => -32015,
            ErrorKind::Io => -32016,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Config(_) => ErrorKind::Config,
            BridgeError::Auth(_) => ErrorKind::Auth,
            BridgeError::NotFound(_) => ErrorKind::NotFound,
            BridgeError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            BridgeError::Upstream { .. } => ErrorKind::Upstream,
            BridgeError::Protocol(_) => ErrorKind::Protocol,
            BridgeError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn code(&self) -> i64 {
        self.kind().code()
    }

    /// Whether a cached value may stand in for a failed refresh.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::UpstreamUnavailable(_))
    }

    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        BridgeError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
