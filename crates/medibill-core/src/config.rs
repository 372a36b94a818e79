//! Application configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit file (`--config`) or ~/.local/share/medibill/config.toml
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Environment variables are applied last:
//! - `GEMINI_API_KEY`: the model provider credential (required for analysis)
//! - `GEMINI_MODEL`: model name override
//! - `GEMINI_HOST`: API base URL override
//! - `AI_BACKEND`: `gemini` (default) or `mock`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Environment variable holding the model provider credential
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/medibill.toml");

/// Which AI backend serves analysis requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gemini,
    /// Canned responses, no network
    Mock,
}

impl BackendKind {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => Self::Gemini,
            "mock" => Self::Mock,
            other => {
                warn!(backend = %other, "Unknown AI backend, falling back to gemini");
                Self::Gemini
            }
        }
    }
}

/// Gemini connection settings
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub host: String,
    pub model: String,
    /// Credential; `None` means analysis is misconfigured
    pub api_key: Option<String>,
    /// Per-request timeout (`None` = HTTP client default)
    pub timeout: Option<Duration>,
    /// Retries after an upstream failure
    pub max_retries: u32,
    /// Base delay between retries, doubled on each attempt
    pub retry_backoff: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            host: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            timeout: None,
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_size_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Sign-in policy
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub min_password_len: usize,
    /// Consecutive failures before an email is throttled
    pub max_failed_attempts: u32,
    /// How long a throttled email stays locked
    pub lockout: Duration,
    /// Absolute lifetime of a signed-in session
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_len: 8,
            max_failed_attempts: 5,
            lockout: Duration::from_secs(300),
            session_ttl: Duration::from_secs(12 * 60 * 60),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub gemini: GeminiConfig,
    pub upload: UploadConfig,
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Gemini,
            gemini: GeminiConfig::default(),
            upload: UploadConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from file (explicit or default location) plus environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = load_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse config from TOML content, on top of the built-in defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(GEMINI_API_KEY_VAR) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = non_empty("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(host) = non_empty("GEMINI_HOST") {
            self.gemini.host = host.trim_end_matches('/').to_string();
        }
        if let Some(backend) = non_empty("AI_BACKEND") {
            self.backend = BackendKind::parse(&backend);
        }
    }

    /// Whether the provider credential is present
    pub fn has_credential(&self) -> bool {
        self.gemini.api_key.is_some()
    }
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("medibill").join("config.toml"))
}

fn load_file(path: Option<&Path>) -> Result<AppConfig> {
    let content = match path {
        Some(explicit) => fs::read_to_string(explicit).map_err(|e| {
            Error::InvalidData(format!(
                "Failed to read config {}: {}",
                explicit.display(),
                e
            ))
        })?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(user_path) => fs::read_to_string(&user_path).map_err(|e| {
                Error::InvalidData(format!(
                    "Failed to read config {}: {}",
                    user_path.display(),
                    e
                ))
            })?,
            None => DEFAULT_CONFIG.to_string(),
        },
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    backend: Option<String>,
    gemini: Option<RawGemini>,
    upload: Option<RawUpload>,
    auth: Option<RawAuth>,
}

#[derive(Debug, Deserialize)]
struct RawGemini {
    host: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawUpload {
    max_size_mb: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawAuth {
    min_password_len: Option<usize>,
    max_failed_attempts: Option<u32>,
    lockout_secs: Option<u64>,
    session_ttl_secs: Option<u64>,
}

fn parse_config(content: &str) -> Result<AppConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

    let mut config = AppConfig::default();

    if let Some(backend) = raw.backend {
        config.backend = BackendKind::parse(&backend);
    }

    if let Some(gemini) = raw.gemini {
        if let Some(host) = gemini.host {
            config.gemini.host = host.trim_end_matches('/').to_string();
        }
        if let Some(model) = gemini.model {
            config.gemini.model = model;
        }
        if let Some(key) = gemini.api_key.filter(|k| !k.trim().is_empty()) {
            config.gemini.api_key = Some(key);
        }
        config.gemini.timeout = gemini.timeout_secs.map(Duration::from_secs);
        if let Some(retries) = gemini.max_retries {
            config.gemini.max_retries = retries;
        }
        if let Some(backoff) = gemini.retry_backoff_ms {
            config.gemini.retry_backoff = Duration::from_millis(backoff);
        }
    }

    if let Some(upload) = raw.upload {
        if let Some(mb) = upload.max_size_mb {
            config.upload.max_size_bytes = mb * 1024 * 1024;
        }
    }

    if let Some(auth) = raw.auth {
        if let Some(len) = auth.min_password_len {
            config.auth.min_password_len = len;
        }
        if let Some(attempts) = auth.max_failed_attempts {
            config.auth.max_failed_attempts = attempts;
        }
        if let Some(secs) = auth.lockout_secs {
            config.auth.lockout = Duration::from_secs(secs);
        }
        if let Some(secs) = auth.session_ttl_secs {
            config.auth.session_ttl = Duration::from_secs(secs);
        }
    }

    Ok(config)
}
