//! MediBill Core Library
//!
//! Shared functionality for the MediBill medical bill appeal tool:
//! - Document intake and inline encoding
//! - Analysis request building and response normalization
//! - Pluggable AI backends (Gemini, mock)
//! - Prompt library for customizable model instructions
//! - Appeal letter formatting, PDF export and mail handoff
//! - In-memory accounts, sessions and the protected-view gate

pub mod ai;
pub mod analysis;
pub mod analyzer;
pub mod auth;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod letter;
pub mod models;
pub mod present;
pub mod prompts;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, GeminiBackend, MockBackend};
pub use analysis::{build_request, normalize_response, AnalysisRequest};
pub use analyzer::{BillAnalyzer, RetryPolicy};
pub use auth::{
    AuthErrorCode, AuthFlow, AuthGate, AuthService, AuthSession, GateDecision, GateState,
    SessionContext,
};
pub use config::{AppConfig, BackendKind};
pub use document::{EncodedDocument, UploadedDocument};
pub use error::{Error, Result};
pub use export::{render_letter_pdf, LetterLayout, PDF_FILE_NAME};
pub use letter::{format_letter_as_text, letter_paragraphs};
pub use models::{AnalysisResult, User};
pub use present::{mailto_uri, ResultsView, DEFAULT_EMAIL_SUBJECT};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
