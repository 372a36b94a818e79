//! Pluggable AI backend abstraction
//!
//! Bill analysis is a single structured-output call against a hosted
//! multimodal model. The backend only transports the request and returns the
//! raw text; prompt building and normalization live in [`crate::analysis`].
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all AI operations
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = AppConfig::load(None)?;
//! let ai = AIClient::from_config(&config)?;
//! let raw = ai.generate(&request).await?;
//! ```

mod gemini;
mod mock;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, SAMPLE_RESPONSE};

use async_trait::async_trait;

use crate::analysis::AnalysisRequest;
use crate::config::{AppConfig, BackendKind};
use crate::error::Result;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Send one analysis request and return the model's raw text
    async fn generate(&self, request: &AnalysisRequest) -> Result<String>;

    /// Check if the backend is reachable with the configured credential
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Gemini `generateContent` API
    Gemini(GeminiBackend),
    /// Mock backend for testing and offline development
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from resolved configuration
    ///
    /// Fails with [`crate::Error::Configuration`] when the Gemini backend is
    /// selected but no credential is set.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match config.backend {
            BackendKind::Gemini => GeminiBackend::from_config(&config.gemini).map(AIClient::Gemini),
            BackendKind::Mock => Ok(AIClient::Mock(MockBackend::new())),
        }
    }

    /// Create a Gemini backend directly
    pub fn gemini(host: &str, model: &str, api_key: &str) -> Self {
        AIClient::Gemini(GeminiBackend::new(host, model, api_key))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        match self {
            AIClient::Gemini(b) => b.generate(request).await,
            AIClient::Mock(b) => b.generate(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
