//! Back-office login and logout.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAdmin, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::services::AdminAuthService;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub user: CurrentAdmin,
}

#[derive(Debug, Serialize)]
pub struct LoggedOut {
    pub success: bool,
}

/// Log in as an administrator.
///
/// # Errors
///
/// Returns 401 for a wrong email or password and 403 for a shopper account.
/// Neither case creates a session.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<AdminResponse>> {
    let admin = AdminAuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Admin login failed"))?;

    set_current_admin(&session, &admin).await?;
    set_sentry_user(&admin.id, Some(admin.email.as_str()));

    tracing::info!(user_id = %admin.id, "Admin logged in");
    Ok(Json(AdminResponse { user: admin }))
}

/// End the admin session.
///
/// # Errors
///
/// Returns 500 if the session store cannot be updated.
pub async fn logout(session: Session) -> Result<Json<LoggedOut>> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(Json(LoggedOut { success: true }))
}

/// The logged-in administrator.
pub async fn me(RequireAdmin(admin): RequireAdmin) -> Json<AdminResponse> {
    Json(AdminResponse { user: admin })
}
