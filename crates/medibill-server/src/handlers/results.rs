//! Results view, letter export and mail handoff handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Response, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, SuccessResponse};
use medibill_core::export::appeal_letter_pdf;
use medibill_core::{mailto_uri, AuthSession, ResultsView, DEFAULT_EMAIL_SUBJECT, PDF_FILE_NAME};

/// GET /api/results - Everything the results view renders for this session
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<ResultsView> {
    let analysis = state.auth.analysis(&session.token).await;
    Json(ResultsView::from_analysis(analysis.as_ref()))
}

/// DELETE /api/results - Clear the current result ahead of a new upload
pub async fn clear_results(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<SuccessResponse> {
    let success = state.auth.clear_analysis(&session.token).await;
    Json(SuccessResponse { success })
}

/// GET /api/results/letter.pdf - Download the formatted appeal letter
pub async fn download_letter_pdf(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Response<Body>, AppError> {
    let analysis = state
        .auth
        .analysis(&session.token)
        .await
        .ok_or_else(|| AppError::not_found("No analysis available"))?;

    let pdf = appeal_letter_pdf(&analysis)?;
    info!(bytes = pdf.len(), "Exported appeal letter");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", PDF_FILE_NAME),
        )
        .body(Body::from(pdf))
        .map_err(|e| AppError::internal(&e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct MailtoQuery {
    /// Overrides the default subject line
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MailtoResponse {
    pub uri: String,
}

/// GET /api/results/mailto - Compose URI for the drafted email
pub async fn get_mailto(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Query(params): Query<MailtoQuery>,
) -> Result<Json<MailtoResponse>, AppError> {
    let analysis = state
        .auth
        .analysis(&session.token)
        .await
        .ok_or_else(|| AppError::not_found("No analysis available"))?;

    let subject = params.subject.as_deref().unwrap_or(DEFAULT_EMAIL_SUBJECT);
    Ok(Json(MailtoResponse {
        uri: mailto_uri(subject, &analysis.email),
    }))
}
