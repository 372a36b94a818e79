//! Accounts, sessions and the protected-view gate
//!
//! Users live in memory for the lifetime of the process. Each signed-in
//! session owns one [`SessionContext`], which carries the user and the single
//! analysis slot that every upload overwrites. The registry is created once at
//! startup and shared through application state.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, User};

/// Token of the single session used when authentication is disabled
pub const LOCAL_SESSION_TOKEN: &str = "local";

const LOCAL_USER_EMAIL: &str = "local@localhost";

/// Message for failures that carry no auth code
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Auth failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
    InvalidEmail,
    UserNotFound,
    WrongPassword,
    TooManyRequests,
    EmailAlreadyInUse,
    WeakPassword,
}

impl AuthErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "auth/invalid-email",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::WeakPassword => "auth/weak-password",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "auth/invalid-email" => Some(Self::InvalidEmail),
            "auth/user-not-found" => Some(Self::UserNotFound),
            "auth/wrong-password" => Some(Self::WrongPassword),
            "auth/too-many-requests" => Some(Self::TooManyRequests),
            "auth/email-already-in-use" => Some(Self::EmailAlreadyInUse),
            "auth/weak-password" => Some(Self::WeakPassword),
            _ => None,
        }
    }
}

/// Which form produced the error; messages differ per flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    SignIn,
    SignUp,
    PasswordReset,
}

impl AuthFlow {
    /// Human-readable message for `code` in this flow
    ///
    /// Codes a flow doesn't expect fall back to the flow's generic message.
    pub fn message_for(&self, code: AuthErrorCode) -> &'static str {
        use AuthErrorCode::*;
        match (self, code) {
            (Self::SignIn, InvalidEmail) => "Invalid email address.",
            (Self::SignIn, UserNotFound) => "No account found with this email.",
            (Self::SignIn, WrongPassword) => "Incorrect password.",
            (Self::SignIn, TooManyRequests) => {
                "Too many failed attempts. Please try again later."
            }
            (Self::SignUp, EmailAlreadyInUse) => "An account with this email already exists.",
            (Self::SignUp, InvalidEmail) => "Please enter a valid email address.",
            (Self::SignUp, WeakPassword) => "Please choose a stronger password.",
            (Self::PasswordReset, InvalidEmail) => "Invalid email address.",
            (Self::PasswordReset, UserNotFound) => "No account found with this email.",
            (Self::PasswordReset, TooManyRequests) => "Too many requests. Please try again later.",
            _ => self.default_message(),
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::SignIn => "Failed to sign in. Please try again.",
            Self::SignUp => "Unable to create account. Please try again.",
            Self::PasswordReset => "Failed to send reset email. Please try again.",
        }
    }
}

/// Map a raw error code to the message shown on the given form
///
/// `None` means the failure carried no code at all.
pub fn user_message(flow: AuthFlow, code: Option<&str>) -> &'static str {
    match code {
        None => UNEXPECTED_ERROR_MESSAGE,
        Some(raw) => AuthErrorCode::from_code(raw)
            .map(|c| flow.message_for(c))
            .unwrap_or_else(|| flow.default_message()),
    }
}

/// Token and user returned by a successful sign-in or sign-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Per-session state: the signed-in user plus the current analysis
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user: User,
    pub analysis: Option<AnalysisResult>,
    pub created_at: DateTime<Utc>,
    opened: Instant,
}

impl SessionContext {
    fn new(user: User) -> Self {
        Self {
            user,
            analysis: None,
            created_at: Utc::now(),
            opened: Instant::now(),
        }
    }

    /// Sessions live for `ttl`; the local session never expires
    fn is_expired(&self, token: &str, ttl: Duration) -> bool {
        token != LOCAL_SESSION_TOKEN && self.opened.elapsed() >= ttl
    }
}

/// Auth check state as seen by a protected view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Still resolving who the caller is
    Pending,
    /// Resolved, with or without a signed-in user
    Resolved(Option<User>),
}

/// What a protected view should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Show a loading indicator
    Loading,
    /// Send the caller to sign-in and render nothing else
    RedirectToSignIn,
    /// Render the view for this user
    Render(User),
}

/// Gate in front of every protected view
pub struct AuthGate;

impl AuthGate {
    pub const SIGN_IN_PATH: &'static str = "/login";

    pub fn decide(state: &GateState) -> GateDecision {
        match state {
            GateState::Pending => GateDecision::Loading,
            GateState::Resolved(None) => GateDecision::RedirectToSignIn,
            GateState::Resolved(Some(user)) => GateDecision::Render(user.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

/// Consecutive failures for one key within the lockout window
#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    window_start: Instant,
}

/// In-memory user directory and session registry
#[derive(Debug)]
pub struct AuthService {
    policy: AuthConfig,
    users: RwLock<HashMap<String, StoredUser>>,
    sessions: RwLock<HashMap<String, SessionContext>>,
    attempts: RwLock<HashMap<String, Attempts>>,
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new(AuthConfig::default())
    }
}

impl AuthService {
    pub fn new(policy: AuthConfig) -> Self {
        Self {
            policy,
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Create an account and sign it in
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email)?;
        check_password_strength(password, self.policy.min_password_len)?;
        if self.users.read().await.contains_key(&email) {
            return Err(AuthErrorCode::EmailAlreadyInUse.into());
        }

        let password_hash = hash_password(password.to_string()).await?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
        };

        {
            let mut users = self.users.write().await;
            if users.contains_key(&email) {
                return Err(AuthErrorCode::EmailAlreadyInUse.into());
            }
            users.insert(
                email,
                StoredUser {
                    user: user.clone(),
                    password_hash,
                },
            );
        }

        info!(user_id = %user.id, "Account created");
        Ok(self.open_session(user).await)
    }

    /// Verify credentials and start a session
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email)?;
        let sign_in_key = format!("sign-in:{email}");
        self.reserve_attempt(&sign_in_key).await?;

        let stored = self.users.read().await.get(&email).cloned();
        let Some(stored) = stored else {
            return Err(AuthErrorCode::UserNotFound.into());
        };

        if !verify_password(password.to_string(), stored.password_hash.clone()).await? {
            warn!(user_id = %stored.user.id, "Failed sign-in attempt");
            return Err(AuthErrorCode::WrongPassword.into());
        }

        self.attempts.write().await.remove(&sign_in_key);
        Ok(self.open_session(stored.user).await)
    }

    /// Accept a password reset request
    ///
    /// Delivery is out of scope; the request is validated, throttled and logged.
    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        let email = normalize_email(email)?;
        let reset_key = format!("reset:{email}");
        self.reserve_attempt(&reset_key).await?;

        let user_id = self
            .users
            .read()
            .await
            .get(&email)
            .map(|u| u.user.id.clone())
            .ok_or(Error::Auth(AuthErrorCode::UserNotFound))?;

        info!(user_id = %user_id, "Password reset requested");
        Ok(())
    }

    /// End a session, discarding its analysis
    pub async fn sign_out(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token).is_some();
        if removed {
            debug!("Session closed");
        }
        removed
    }

    /// Snapshot of the session behind `token`, dropping it once expired
    pub async fn session(&self, token: &str) -> Option<SessionContext> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return None,
                Some(session) if !session.is_expired(token, self.policy.session_ttl) => {
                    return Some(session.clone())
                }
                Some(_) => {}
            }
        }

        self.sessions.write().await.remove(token);
        debug!("Session expired");
        None
    }

    /// Resolve `token` to a gate state
    pub async fn gate_state(&self, token: Option<&str>) -> GateState {
        let user = match token {
            Some(token) => self.session(token).await.map(|s| s.user),
            None => None,
        };
        GateState::Resolved(user)
    }

    /// Replace the session's analysis; false when the session is gone
    pub async fn store_analysis(&self, token: &str, analysis: AnalysisResult) -> bool {
        match self.sessions.write().await.get_mut(token) {
            Some(session) => {
                session.analysis = Some(analysis);
                true
            }
            None => false,
        }
    }

    /// Clear the analysis slot ahead of a new upload
    pub async fn clear_analysis(&self, token: &str) -> bool {
        match self.sessions.write().await.get_mut(token) {
            Some(session) => {
                session.analysis = None;
                true
            }
            None => false,
        }
    }

    pub async fn analysis(&self, token: &str) -> Option<AnalysisResult> {
        self.sessions
            .read()
            .await
            .get(token)
            .and_then(|s| s.analysis.clone())
    }

    /// The single session used when authentication is disabled
    ///
    /// Created on first use and kept for the life of the process.
    pub async fn local_session(&self) -> AuthSession {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(LOCAL_SESSION_TOKEN.to_string())
            .or_insert_with(|| {
                SessionContext::new(User {
                    id: LOCAL_SESSION_TOKEN.to_string(),
                    email: LOCAL_USER_EMAIL.to_string(),
                })
            });
        AuthSession {
            token: LOCAL_SESSION_TOKEN.to_string(),
            user: session.user.clone(),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn open_session(&self, user: User) -> AuthSession {
        let token = Uuid::new_v4().to_string();
        let ttl = self.policy.session_ttl;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|token, session| !session.is_expired(token, ttl));
        sessions.insert(token.clone(), SessionContext::new(user.clone()));
        drop(sessions);

        debug!(user_id = %user.id, "Session opened");
        AuthSession { token, user }
    }

    /// Count an attempt against `key`, refusing it once the limit is reached
    ///
    /// The check and the increment share one write guard, so concurrent
    /// attempts cannot all pass before any of them is counted. A successful
    /// sign-in removes the entry again.
    async fn reserve_attempt(&self, key: &str) -> Result<()> {
        let lockout = self.policy.lockout;
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, entry| entry.window_start.elapsed() < lockout);

        let entry = attempts.entry(key.to_string()).or_insert_with(|| Attempts {
            count: 0,
            window_start: Instant::now(),
        });
        if entry.count >= self.policy.max_failed_attempts {
            return Err(AuthErrorCode::TooManyRequests.into());
        }
        entry.count += 1;
        Ok(())
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"))
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email_pattern().is_match(&email) {
        Ok(email)
    } else {
        Err(AuthErrorCode::InvalidEmail.into())
    }
}

/// At least `min_len` characters with an uppercase letter, a lowercase letter and a digit
fn check_password_strength(password: &str, min_len: usize) -> Result<()> {
    let long_enough = password.chars().count() >= min_len;
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_upper && has_lower && has_digit {
        Ok(())
    } else {
        Err(AuthErrorCode::WeakPassword.into())
    }
}

// Argon2 is CPU-bound; it runs on the blocking pool
async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| Error::InvalidData(format!("Failed to create salt: {}", e)))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::InvalidData(format!("Failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| Error::InvalidData(format!("Password hashing task failed: {}", e)))?
}

async fn verify_password(password: String, stored: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored)
            .map_err(|e| Error::InvalidData(format!("Corrupt password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| Error::InvalidData(format!("Password check task failed: {}", e)))?
}
