//! Gemini backend implementation
//!
//! Talks to the `generateContent` endpoint of the Generative Language API.
//! One call carries the instruction text, the base64 document inline, and
//! the declared response schema; the model is asked for JSON only.
//!
//! # Configuration
//!
//! - `GEMINI_API_KEY`: credential (required)
//! - `GEMINI_MODEL`: model name (default: gemini-2.5-flash)
//! - `GEMINI_HOST`: API base URL (default: https://generativelanguage.googleapis.com)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::analysis::AnalysisRequest;
use crate::config::{GeminiConfig, GEMINI_API_KEY_VAR};
use crate::error::{Error, Result};

use super::AIBackend;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Option<Duration>,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout: None,
        }
    }

    /// Bound each request by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create from resolved configuration
    ///
    /// A missing credential is a configuration error, reported before any
    /// network activity.
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration(GEMINI_API_KEY_VAR.to_string()))?;

        let mut backend = Self::new(&config.host, &config.model, api_key);
        backend.timeout = config.timeout;
        Ok(backend)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}{}", self.base_url, self.model, method)
    }
}

#[async_trait]
impl AIBackend for GeminiBackend {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        let body = GenerateContentRequest::from_analysis(request);

        debug!(
            model = %self.model,
            mime_type = %request.document.mime_type,
            encoded_len = request.document.data.len(),
            "Sending analysis request to Gemini"
        );

        let mut req_builder = self
            .http_client
            .post(self.endpoint(":generateContent"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body);

        if let Some(timeout) = self.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Unreadable Gemini response: {}", e)))?;

        parsed.into_text()
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(self.endpoint(""))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), "Gemini health check rejected");
                false
            }
            Err(e) => {
                debug!(error = %e, "Gemini health check failed");
                false
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// `generateContent` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn from_analysis(request: &AnalysisRequest) -> Self {
        Self {
            system_instruction: request.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part::Text { text: text.clone() }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::Text {
                        text: request.prompt.clone(),
                    },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: request.document.mime_type.clone(),
                            data: request.document.data.clone(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: request.schema.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

/// `generateContent` response body (only the fields we read)
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate
    fn into_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Upstream("No candidates in Gemini response".into()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(Error::Upstream("Gemini returned no text".into()));
        }
        Ok(text)
    }
}
