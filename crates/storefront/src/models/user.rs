//! Account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use omoide_core::{Email, UserId, UserRole};

/// A registered shopper.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: UserRole,
    pub image: Option<String>,
    pub phone_number: Option<String>,
    pub postal_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub building: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Editable profile fields, already validated.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub email: Email,
    pub phone_number: Option<String>,
    pub postal_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub building: Option<String>,
    pub image: Option<String>,
}
