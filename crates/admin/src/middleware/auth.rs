//! Authentication extractors for the back-office.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

const LOGIN_REQUIRED: &str = "認証が必要です";
const ADMIN_REQUIRED: &str = "管理者権限が必要です";

/// Extractor that requires a logged-in administrator.
///
/// The session proves who the caller is; the role is re-read from the
/// database so a demotion takes effect on the next request.
///
/// - 401 when there is no admin session (or the account was deleted)
/// - 403 when the account no longer has the ADMIN role
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAdmin(admin): RequireAdmin) -> String {
///     format!("こんにちは、{}さん", admin.email)
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized(LOGIN_REQUIRED.to_string()))?;

        let admin: CurrentAdmin = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized(LOGIN_REQUIRED.to_string()))?;

        match UserRepository::new(state.pool()).role(admin.id).await? {
            Some(role) if role.is_admin() => Ok(Self(admin)),
            Some(_) => {
                tracing::warn!(user_id = %admin.id, "Demoted user used an admin session");
                Err(AppError::Forbidden(ADMIN_REQUIRED.to_string()))
            }
            None => {
                session.flush().await?;
                Err(AppError::Unauthorized(LOGIN_REQUIRED.to_string()))
            }
        }
    }
}

/// Store the admin in the session, rotating the session ID.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// End the admin session.
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
