//! Error types for MediBill

use thiserror::Error;

use crate::auth::AuthErrorCode;

#[derive(Error, Debug)]
pub enum Error {
    /// A required credential is not configured (carries the variable name)
    #[error("Server misconfigured: Missing {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The external model call failed (network, quota, model error)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The model answered with text that is not JSON (carries the raw text)
    #[error("AI response was not valid JSON")]
    InvalidResponseFormat(String),

    #[error("Authentication error: {}", .0.code())]
    Auth(AuthErrorCode),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl From<AuthErrorCode> for Error {
    fn from(code: AuthErrorCode) -> Self {
        Error::Auth(code)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
