//! MediBill Web Server
//!
//! Axum-based REST API for the MediBill medical bill appeal tool.
//!
//! Security features:
//! - Session authentication on every protected route (use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Upload size limit (10 MB by default)
//! - Sanitized error responses: model output and upstream errors are logged, never returned

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use medibill_core::auth::{user_message, UNEXPECTED_ERROR_MESSAGE};
use medibill_core::config::GEMINI_API_KEY_VAR;
use medibill_core::{
    AIBackend, AppConfig, AuthErrorCode, AuthFlow, AuthGate, AuthService, AuthSession,
    BillAnalyzer, Error, GateDecision,
};

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Returned for any analysis failure that has no more specific message
pub const PROCESSING_FAILED_MESSAGE: &str = "Failed to process document.";

/// Returned when the model answers with something other than JSON
pub const INVALID_AI_RESPONSE_MESSAGE: &str = "AI response was not valid JSON.";

/// Authorization header carrying the session token
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// Largest accepted upload body, in bytes
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            max_upload_size: MAX_UPLOAD_SIZE,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// `None` when the provider credential is missing; uploads then fail with a
    /// configuration error instead of the server refusing to start
    pub analyzer: Option<BillAnalyzer>,
    /// Account directory and per-session analysis slots
    pub auth: Arc<AuthService>,
}

/// Authentication middleware - resolves the bearer token to a session
///
/// Applies the [`AuthGate`] to every protected route: a resolved user is
/// attached to the request as an [`AuthSession`] extension, anything else gets
/// a 401. With authentication disabled every request runs in the single local
/// session.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = if state.config.require_auth {
        let token = bearer_token(request.headers()).map(str::to_string);
        let gate = state.auth.gate_state(token.as_deref()).await;
        match AuthGate::decide(&gate) {
            GateDecision::Render(user) => token.map(|token| AuthSession { token, user }),
            GateDecision::Loading | GateDecision::RedirectToSignIn => None,
        }
    } else {
        Some(state.auth.local_session().await)
    };

    match session {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => {
            warn!(path = %request.uri().path(), "Unauthorized request - no valid session");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "Authentication required",
                    "redirect": AuthGate::SIGN_IN_PATH
                })),
            )
                .into_response()
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
///
/// The analyzer is built from `app_config`; a missing credential is logged
/// here and reported on each upload.
pub fn create_router(
    app_config: &AppConfig,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> Router {
    let analyzer = match BillAnalyzer::from_config(app_config) {
        Ok(analyzer) => {
            info!(
                "AI backend configured: {} (model: {})",
                analyzer.ai().host(),
                analyzer.ai().model()
            );
            Some(analyzer)
        }
        Err(e) => {
            warn!(
                error = %e,
                "AI backend not configured (set {} to enable analysis)",
                GEMINI_API_KEY_VAR
            );
            None
        }
    };

    let auth = Arc::new(AuthService::new(app_config.auth.clone()));
    create_router_with_options(analyzer, auth, static_dir, config)
}

/// Create the application router with an explicit analyzer and session registry (for testing)
pub fn create_router_with_options(
    analyzer: Option<BillAnalyzer>,
    auth: Arc<AuthService>,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> Router {
    let state = Arc::new(AppState {
        config: config.clone(),
        analyzer,
        auth,
    });

    let public_routes = Router::new()
        .route("/auth/signup", post(handlers::sign_up))
        .route("/auth/login", post(handlers::sign_in))
        .route("/auth/reset", post(handlers::reset_password));

    let protected_routes = Router::new()
        // Session
        .route("/me", get(handlers::get_me))
        .route("/auth/logout", post(handlers::sign_out))
        // Analysis
        .route(
            "/upload",
            post(handlers::upload_bill).layer(DefaultBodyLimit::max(config.max_upload_size)),
        )
        // Results
        .route(
            "/results",
            get(handlers::get_results).delete(handlers::clear_results),
        )
        .route("/results/letter.pdf", get(handlers::download_letter_pdf))
        .route("/results/mailto", get(handlers::get_mailto))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    // Build CORS layer
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // CSP: same-origin scripts, inline styles for the results view, blob: for the PDF preview
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    app_config: AppConfig,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    check_ai_connection(&app_config).await;

    let app = create_router(&app_config, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(app_config: &AppConfig) {
    match BillAnalyzer::from_config(app_config) {
        Ok(analyzer) => {
            let ai = analyzer.ai();
            if ai.health_check().await {
                info!("✅ AI backend connected: {} (model: {})", ai.host(), ai.model());
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (model: {})",
                    ai.host(),
                    ai.model()
                );
            }
        }
        Err(_) => {
            warn!(
                "⚠️  {} not set - uploads will fail until it is configured",
                GEMINI_API_KEY_VAR
            );
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    /// Machine-readable code for auth failures
    code: Option<&'static str>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            code: None,
            internal: None,
        }
    }

    /// Map an analysis failure to the upload endpoint's error contract
    pub fn from_analysis(err: Error) -> Self {
        match err {
            e @ Error::Configuration(_) => Self::internal(&e.to_string()),
            Error::Validation(msg) => Self::bad_request(&msg),
            // Raw text was logged at parse time
            Error::InvalidResponseFormat(_) => Self::internal(INVALID_AI_RESPONSE_MESSAGE),
            other => Self {
                internal: Some(other.into()),
                ..Self::internal(PROCESSING_FAILED_MESSAGE)
            },
        }
    }

    /// Map an account failure to the message shown on the given form
    pub fn from_auth(flow: AuthFlow, err: Error) -> Self {
        match err {
            Error::Auth(code) => Self {
                status: auth_status(code),
                message: user_message(flow, Some(code.code())).to_string(),
                code: Some(code.code()),
                internal: None,
            },
            other => Self {
                internal: Some(other.into()),
                ..Self::internal(UNEXPECTED_ERROR_MESSAGE)
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn auth_status(code: AuthErrorCode) -> StatusCode {
    match code {
        AuthErrorCode::InvalidEmail | AuthErrorCode::WeakPassword => StatusCode::BAD_REQUEST,
        AuthErrorCode::UserNotFound | AuthErrorCode::WrongPassword => StatusCode::UNAUTHORIZED,
        AuthErrorCode::EmailAlreadyInUse => StatusCode::CONFLICT,
        AuthErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = match self.code {
            Some(code) => Json(serde_json::json!({
                "error": self.message,
                "code": code,
            })),
            None => Json(serde_json::json!({
                "error": self.message
            })),
        };

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            code: None,
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
