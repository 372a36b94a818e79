//! End-to-end bill analysis
//!
//! encode -> build request -> invoke -> normalize. Only the invocation sits
//! behind the retry policy; a response that fails to parse is never retried.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tracing::{error, info, warn};

use crate::ai::{AIBackend, AIClient};
use crate::analysis::{build_request, normalize_response, AnalysisRequest};
use crate::config::{AppConfig, GeminiConfig};
use crate::document::UploadedDocument;
use crate::error::{Error, Result};
use crate::models::AnalysisResult;
use crate::prompts::PromptLibrary;

/// Message used when the upload carries no usable file
pub const NO_FILE_MESSAGE: &str = "No file received.";

/// Retry boundary around the model call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt)
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each subsequent one
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff,
        }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Bill analyzer: one document in, one normalized result out
#[derive(Clone)]
pub struct BillAnalyzer {
    ai: AIClient,
    prompts: Arc<RwLock<PromptLibrary>>,
    retry: RetryPolicy,
}

impl BillAnalyzer {
    /// Create an analyzer with default prompts and no retry
    pub fn new(ai: AIClient) -> Self {
        Self {
            ai,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
            retry: RetryPolicy::none(),
        }
    }

    /// Create from resolved configuration
    ///
    /// Fails with [`Error::Configuration`] when the credential is missing.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let ai = AIClient::from_config(config)?;
        Ok(Self::new(ai).with_retry(RetryPolicy::from_config(&config.gemini)))
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn ai(&self) -> &AIClient {
        &self.ai
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Analyze a document as of today's local date
    pub async fn analyze(&self, document: &UploadedDocument) -> Result<AnalysisResult> {
        self.analyze_on(document, Local::now().date_naive()).await
    }

    /// Analyze a document as of `today`
    pub async fn analyze_on(
        &self,
        document: &UploadedDocument,
        today: NaiveDate,
    ) -> Result<AnalysisResult> {
        if document.bytes.is_empty() {
            return Err(Error::Validation(NO_FILE_MESSAGE.to_string()));
        }

        let request = {
            let mut prompts = self
                .prompts
                .write()
                .map_err(|e| Error::InvalidData(format!("Lock error: {}", e)))?;
            build_request(&mut prompts, document, today)?
        };

        let raw = self.invoke(&request).await?;
        let result = normalize_response(&raw)?;

        info!(
            model = %self.ai.model(),
            percentage = result.percentage,
            potential_money_back = result.potential_money_back,
            total_billed_amount = result.total_billed_amount,
            "Bill analysis complete"
        );
        Ok(result)
    }

    async fn invoke(&self, request: &AnalysisRequest) -> Result<String> {
        let mut retry = 0;
        loop {
            match self.ai.generate(request).await {
                Ok(text) => return Ok(text),
                Err(Error::Upstream(reason)) if retry < self.retry.max_retries => {
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    error!(error = %e, host = %self.ai.host(), "Model call failed");
                    return Err(e);
                }
            }
        }
    }
}
