//! Account route handlers: profile and password.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::{RepositoryError, UserRepository};
use crate::error::Result;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;
use crate::validation::{
    PasswordChangeForm, ProfileForm, validate_password_change, validate_profile,
};

/// Build the user router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/user/profile", get(profile).put(update_profile))
        .route("/api/user/password", post(change_password))
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdated {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct PasswordChanged {
    pub message: &'static str,
}

/// The current user's profile.
///
/// # Errors
///
/// Returns 404 if the account no longer exists.
pub async fn profile(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(Json(user))
}

/// Replace the editable profile fields.
///
/// The session snapshot is refreshed so a changed name or email shows at once.
///
/// # Errors
///
/// Returns 400 with every invalid field and 409 if the new email is taken.
#[instrument(skip(state, session, form), fields(user_id = %current.id))]
pub async fn update_profile(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ProfileForm>,
) -> Result<Json<ProfileUpdated>> {
    let profile = validate_profile(form)?;
    let user = UserRepository::new(state.pool())
        .update_profile(current.id, &profile)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            RepositoryError::NotFound => AuthError::UserNotFound,
            other => AuthError::Repository(other),
        })?;

    let refreshed = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: current.role,
    };
    set_current_user(&session, &refreshed).await?;

    Ok(Json(ProfileUpdated {
        message: "プロフィールを更新しました",
        user,
    }))
}

/// Change the password after checking the current one.
///
/// # Errors
///
/// Returns 400 for invalid fields or a wrong current password.
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn change_password(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(form): Json<PasswordChangeForm>,
) -> Result<Json<PasswordChanged>> {
    validate_password_change(&form)?;
    AuthService::new(state.pool())
        .change_password(user.id, &form.current_password, &form.new_password)
        .await?;

    Ok(Json(PasswordChanged {
        message: "パスワードを変更しました",
    }))
}
