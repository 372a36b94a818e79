//! Mock backend for testing
//!
//! Returns a canned analysis without any network access. Useful for unit
//! tests and for running the server without a Gemini credential.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::analysis::AnalysisRequest;
use crate::error::{Error, Result};

use super::AIBackend;

/// Canned model output used by the mock backend
pub const SAMPLE_RESPONSE: &str = r#"{
  "email": "Subject: Duplicate charge on account 55-1029\n\nHello,\n\nI am writing about a duplicate charge for CPT 80053 on 03/14/2026. Please see the attached appeal letter and correct my balance.\n\nThank you,\nJordan Rivera",
  "appeal": "Jordan Rivera\n42 Elm Street\nSpringfield, IL 62704\n\nMarch 30, 2026\n\nRe:\nPatient: Jordan Rivera\nMember ID: XZ4471920\nDate of Service: 03/14/2026\nClaim Number: 2026-031-88812\n\nDear Billing Department,\n\nI am writing to dispute a duplicate charge on my statement.\n\nThe comprehensive metabolic panel (CPT 80053) was billed twice on 03/14/2026 at $212.00 each.\n\nOnly one panel was drawn, as the attached lab requisition shows.\n\nPlease remove the duplicate charge and contact me at your earliest convenience.\n\nSincerely,\nJordan Rivera",
  "potential_money_back": 212,
  "percentage": 85,
  "total_billed_amount": 1840.5
}"#;

/// Mock AI backend for testing
///
/// Can be configured with a custom response, or to fail a number of times
/// before answering.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    response: String,
    failures: u32,
    calls: Arc<AtomicU32>,
    last_request: Arc<Mutex<Option<AnalysisRequest>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy, answers with [`SAMPLE_RESPONSE`])
    pub fn new() -> Self {
        Self {
            healthy: true,
            response: SAMPLE_RESPONSE.to_string(),
            failures: 0,
            calls: Arc::new(AtomicU32::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Answer with `text` instead of the sample
    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.response = text.into();
        self
    }

    /// Fail the first `count` calls with an upstream error
    pub fn failing_times(mut self, count: u32) -> Self {
        self.failures = count;
        self
    }

    /// Fail every call with an upstream error
    pub fn always_failing() -> Self {
        Self::new().failing_times(u32::MAX)
    }

    /// Number of `generate` calls so far (shared between clones)
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request seen by `generate`
    pub fn last_request(&self) -> Option<AnalysisRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);

        {
            let mut last = self
                .last_request
                .lock()
                .map_err(|e| Error::InvalidData(format!("Mock lock error: {}", e)))?;
            *last = Some(request.clone());
        }

        if attempt < self.failures {
            return Err(Error::Upstream("mock upstream failure".into()));
        }
        Ok(self.response.clone())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
