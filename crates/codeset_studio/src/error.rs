//! Error types for the studio.

use thiserror::Error;

/// Result type alias for studio operations.
pub type StudioResult<T> = Result<T, StudioError>;

/// Coarse failure category, used by callers that branch on the taxonomy
/// rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Upstream,
    MalformedResponse,
    NoAssetProduced,
    RenderFailed,
    Session,
    Account,
    Local,
}

/// Errors that can occur in the studio.
#[derive(Error, Debug)]
pub enum StudioError {
    /// Transport or service failure talking to the generation service
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The service answered, but the payload did not parse or lacked required fields
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The service answered successfully without a usable inline payload
    #[error("No asset produced: {0}")]
    NoAssetProduced(String),

    /// The video pipeline failed at some stage
    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Invalid state for {operation}: current={current}, expected={expected}")]
    InvalidState {
        current: String,
        expected: String,
        operation: String,
    },

    /// A generation or revision is already in flight
    #[error("Session busy: {0} already in progress")]
    Busy(String),

    #[error("File index {index} out of range ({len} files)")]
    FileIndexOutOfRange { index: usize, len: usize },

    #[error("Generation service not configured. Set GEMINI_API_KEY or API_KEY")]
    NotConfigured,

    #[error("An account with this email already exists: {0}")]
    AccountExists(String),

    #[error("Invalid credentials. Check your email or password.")]
    InvalidCredentials,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StudioError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Upstream(_) | Self::NotConfigured => ErrorKind::Upstream,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::NoAssetProduced(_) => ErrorKind::NoAssetProduced,
            Self::RenderFailed(_) => ErrorKind::RenderFailed,
            Self::InvalidState { .. } | Self::Busy(_) | Self::FileIndexOutOfRange { .. } => {
                ErrorKind::Session
            }
            Self::AccountExists(_) | Self::InvalidCredentials => ErrorKind::Account,
            Self::Config(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Local,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Upstream(format!("request timed out: {}", err))
        } else if err.is_connect() {
            Self::Upstream(format!("connection failed: {}", err))
        } else {
            Self::Upstream(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StudioError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Upstream(format!("live channel: {}", err))
    }
}
