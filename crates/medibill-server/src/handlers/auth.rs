//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, SuccessResponse};
use medibill_core::{AuthFlow, AuthSession, User};

/// Email and password from the sign-in and sign-up forms
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    /// How the user was authenticated
    pub auth_method: String,
}

/// POST /api/auth/signup - Create an account and start a session
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let session = state
        .auth
        .sign_up(&req.email, &req.password)
        .await
        .map_err(|e| AppError::from_auth(AuthFlow::SignUp, e))?;

    Ok(Json(session))
}

/// POST /api/auth/login - Sign in with email and password
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let session = state
        .auth
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| AppError::from_auth(AuthFlow::SignIn, e))?;

    info!(user_id = %session.user.id, "Signed in");
    Ok(Json(session))
}

/// POST /api/auth/reset - Request a password reset email
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .auth
        .send_password_reset(&req.email)
        .await
        .map_err(|e| AppError::from_auth(AuthFlow::PasswordReset, e))?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/auth/logout - End the current session and drop its results
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<SuccessResponse> {
    let success = state.auth.sign_out(&session.token).await;
    Json(SuccessResponse { success })
}

/// GET /api/me - Get the currently authenticated user
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<MeResponse> {
    let auth_method = if state.config.require_auth {
        "session"
    } else {
        "none"
    };

    Json(MeResponse {
        user: session.user,
        auth_method: auth_method.to_string(),
    })
}
