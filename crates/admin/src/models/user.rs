//! Accounts as seen by staff.

use chrono::{DateTime, Utc};
use serde::Serialize;

use omoide_core::{Email, UserId, UserRole};

/// One row of the user list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub order_count: i64,
}

/// What login needs to check a password.
#[derive(Clone, sqlx::FromRow)]
pub struct Credentials {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: UserRole,
    pub password_hash: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("password_hash", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
