//! Bill upload handler

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{AppError, AppState};
use medibill_core::analyzer::NO_FILE_MESSAGE;
use medibill_core::config::GEMINI_API_KEY_VAR;
use medibill_core::{AnalysisResult, AuthSession, Error, UploadedDocument};

/// Name of the form field carrying the bill
const FILE_FIELD: &str = "file";

/// Response for a successful analysis
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub data: AnalysisResult,
}

/// POST /api/upload - Analyze a medical bill
///
/// Expects a multipart form with a single `file` field (max 10MB). The
/// credential is checked before the body is looked at, so a misconfigured
/// server reports that even for an empty form.
pub async fn upload_bill(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    if state.analyzer.is_none() {
        return Err(AppError::from_analysis(Error::Configuration(
            GEMINI_API_KEY_VAR.to_string(),
        )));
    }

    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "Upload is not a multipart form");
        AppError::bad_request(NO_FILE_MESSAGE)
    })?;

    let mut document: Option<UploadedDocument> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error(e, &state))?
    {
        if field.name() != Some(FILE_FIELD) || document.is_some() {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| read_error(e, &state))?;

        let mut doc = UploadedDocument::new(bytes.to_vec());
        doc.file_name = file_name;
        doc.content_type = content_type;
        document = Some(doc);
    }

    let document = document.ok_or_else(|| AppError::bad_request(NO_FILE_MESSAGE))?;

    analyze_upload_core(&state, &session, document).await
}

/// Core upload logic - separated for testability
///
/// Runs the analysis and, on success, replaces the session's current result.
pub async fn analyze_upload_core(
    state: &AppState,
    session: &AuthSession,
    document: UploadedDocument,
) -> Result<Json<UploadResponse>, AppError> {
    let analyzer = state.analyzer.as_ref().ok_or_else(|| {
        AppError::from_analysis(Error::Configuration(GEMINI_API_KEY_VAR.to_string()))
    })?;

    info!(
        user_id = %session.user.id,
        size = document.bytes.len(),
        file_name = document.file_name.as_deref().unwrap_or("-"),
        "Analyzing uploaded bill"
    );

    let result = analyzer
        .analyze(&document)
        .await
        .map_err(AppError::from_analysis)?;

    if !state.auth.store_analysis(&session.token, result.clone()).await {
        warn!(user_id = %session.user.id, "Session ended before analysis finished");
    }

    Ok(Json(UploadResponse {
        success: true,
        data: result,
    }))
}

fn read_error(err: axum::extract::multipart::MultipartError, state: &AppState) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::bad_request(&format!(
            "File too large. Maximum size is {} MB",
            state.config.max_upload_size / 1024 / 1024
        ));
    }
    warn!(error = %err, "Failed to read upload");
    AppError::bad_request(NO_FILE_MESSAGE)
}
