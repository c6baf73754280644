//! Session-related types.

use serde::{Deserialize, Serialize};

use omoide_core::{Email, UserId};

/// Session-stored staff identity.
///
/// Only written for users whose role was ADMIN at login. The role is
/// re-read from the database on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAdmin {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name, if any.
    pub name: Option<String>,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
