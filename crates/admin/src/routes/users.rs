//! Account management route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use omoide_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::UserSummary;
use crate::routes::not_found_as;
use crate::state::AppState;
use crate::validation::ValidationError;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(index))
        .route("/api/users/{id}/role", put(update_role))
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserSummary>,
}

/// Role change body.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserSummary,
}

/// Every account with its order count, newest first.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserList>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(UserList { users }))
}

/// Grant or revoke the ADMIN role.
///
/// # Errors
///
/// Returns 400 for an unknown role or an administrator demoting themselves,
/// and 404 if the user does not exist.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn update_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(form): Json<RoleForm>,
) -> Result<Json<UserResponse>> {
    let role = parse_role(form.role.as_deref())?;
    check_self_demotion(admin.id, id, role)?;

    let user = UserRepository::new(state.pool())
        .set_role(id, role)
        .await
        .map_err(|e| not_found_as(e, "ユーザーが見つかりません"))?;
    Ok(Json(UserResponse { user }))
}

fn parse_role(raw: Option<&str>) -> std::result::Result<UserRole, ValidationError> {
    raw.map(str::trim)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ValidationError::single("role", "無効な権限です"))
}

/// An administrator may not remove their own ADMIN role.
fn check_self_demotion(actor: UserId, target: UserId, role: UserRole) -> Result<()> {
    if actor == target && !role.is_admin() {
        return Err(AppError::BadRequest(
            "自分自身の管理者権限は解除できません".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(Some("ADMIN")).unwrap(), UserRole::Admin);
        assert_eq!(parse_role(Some("USER")).unwrap(), UserRole::User);
        assert!(parse_role(Some("OWNER")).is_err());
        assert!(parse_role(None).is_err());
    }

    #[test]
    fn test_check_self_demotion() {
        let me = UserId::new(1);
        let other = UserId::new(2);
        assert!(check_self_demotion(me, me, UserRole::User).is_err());
        assert!(check_self_demotion(me, me, UserRole::Admin).is_ok());
        assert!(check_self_demotion(me, other, UserRole::User).is_ok());
    }
}
