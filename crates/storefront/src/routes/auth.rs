//! Authentication route handlers.
//!
//! Email and password accounts with a session cookie. The session stores a
//! [`CurrentUser`] snapshot, including the role at login time.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use omoide_core::{Email, UserId};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the credential router (signup, login, logout).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

/// Build the session lookup router, polled by the frontend.
pub fn session_router() -> Router<AppState> {
    Router::new().route("/api/auth/me", get(me))
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Signup body.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Public part of an account.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Email,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse<T> {
    pub user: T,
}

#[derive(Debug, Serialize)]
pub struct LoggedOut {
    pub success: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account. The new user still has to log in.
///
/// # Errors
///
/// Returns 400 for missing or invalid fields and 409 if the email is taken.
#[instrument(skip(state, form))]
pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<SignupForm>,
) -> Result<(StatusCode, Json<UserResponse<UserSummary>>)> {
    let user = AuthService::new(state.pool())
        .signup(&form.name, &form.email, &form.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse { user: user.into() }),
    ))
}

/// Log in and start a session.
///
/// # Errors
///
/// Returns 401 if the email or password is wrong.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<UserResponse<CurrentUser>>> {
    let user = AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;

    let current = CurrentUser {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
    };
    set_current_user(&session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));

    tracing::info!(user_id = %current.id, "User logged in");
    Ok(Json(UserResponse { user: current }))
}

/// End the session.
///
/// # Errors
///
/// Returns 500 if the session store cannot be updated.
pub async fn logout(session: Session) -> Result<Json<LoggedOut>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(LoggedOut { success: true }))
}

/// The logged-in user, or `null`.
pub async fn me(OptionalAuth(user): OptionalAuth) -> Json<UserResponse<Option<CurrentUser>>> {
    Json(UserResponse { user })
}
