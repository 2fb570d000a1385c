//! Studio configuration.
//!
//! Settings are read from an optional `codeset.toml` and then overlaid with
//! environment variables:
//!
//! ```toml
//! api_base = "https://generativelanguage.googleapis.com/v1beta"
//! video_poll_interval_secs = 5
//! failure_policy = "strict"
//!
//! [models]
//! builder = "gemini-3-pro-preview"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StudioError, StudioResult};

/// Default REST base for the generation service.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default websocket endpoint for live audio sessions.
pub const DEFAULT_LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// How a build session reacts when the initial generation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the error and present an empty, completed build
    #[default]
    Lenient,
    /// Log the error and park the session in a visible failed state
    Strict,
}

/// Model identifiers per capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub planner: String,
    pub builder: String,
    pub image: String,
    pub tts: String,
    pub live: String,
    pub video: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            planner: "gemini-3-flash-preview".to_string(),
            builder: "gemini-3-pro-preview".to_string(),
            image: "gemini-2.5-flash-image".to_string(),
            tts: "gemini-2.5-flash-preview-tts".to_string(),
            live: "gemini-2.5-flash-native-audio-preview-12-2025".to_string(),
            video: "veo-3.1-fast-generate-preview".to_string(),
        }
    }
}

/// Complete studio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// API key for the generation service (never written back to disk)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// REST base URL
    pub api_base: String,
    /// Websocket URL for live sessions
    pub live_endpoint: String,
    /// Models per capability
    pub models: ModelConfig,
    /// Seconds between video status checks
    pub video_poll_interval_secs: u64,
    /// Behaviour when the initial generation fails
    pub failure_policy: FailurePolicy,
    /// Ask the planner to ground proposals with web search
    pub search_grounding: bool,
    /// Location of the key-value store file
    pub store_path: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            live_endpoint: DEFAULT_LIVE_ENDPOINT.to_string(),
            models: ModelConfig::default(),
            video_poll_interval_secs: 5,
            failure_policy: FailurePolicy::Lenient,
            search_grounding: true,
            store_path: PathBuf::from(".codeset").join("store.json"),
        }
    }
}

impl StudioConfig {
    /// Load configuration from a TOML file (if it exists) and the environment.
    ///
    /// When `path` is `None`, `./codeset.toml` is tried.
    pub fn load(path: Option<&Path>) -> StudioResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("codeset.toml"));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file without consulting the environment.
    pub fn from_file(path: &Path) -> StudioResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML configuration text.
    pub fn from_toml_str(content: &str) -> StudioResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| StudioError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables.
    ///
    /// Checks in order:
    /// 1. GEMINI_API_KEY
    /// 2. API_KEY
    pub fn apply_env(&mut self) {
        for var in ["GEMINI_API_KEY", "API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.is_empty() {
                    self.api_key = Some(key);
                    break;
                }
            }
        }
        if let Ok(base) = std::env::var("CODESET_API_BASE") {
            if !base.is_empty() {
                self.api_base = base;
            }
        }
        if let Ok(store) = std::env::var("CODESET_STORE") {
            if !store.is_empty() {
                self.store_path = PathBuf::from(store);
            }
        }
    }

    /// Set the API key explicitly.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the REST base URL.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// API key, or `NotConfigured` when absent.
    pub fn require_api_key(&self) -> StudioResult<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(StudioError::NotConfigured),
        }
    }

    pub fn video_poll_interval(&self) -> Duration {
        Duration::from_secs(self.video_poll_interval_secs)
    }

    fn validate(&self) -> StudioResult<()> {
        if self.api_base.trim().is_empty() {
            return Err(StudioError::Config("api_base must not be empty".to_string()));
        }
        if self.video_poll_interval_secs == 0 {
            return Err(StudioError::Config(
                "video_poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
