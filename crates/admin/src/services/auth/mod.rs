//! Back-office login.
//!
//! Staff sign in with their shop account; only accounts with the ADMIN role
//! get a session. Password hashes are the storefront's Argon2id PHC strings.

mod error;

pub use error::AdminAuthError;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use sqlx::PgPool;
use tracing::instrument;

use omoide_core::Email;

use crate::db::UserRepository;
use crate::models::CurrentAdmin;

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Check an email and password and require the ADMIN role.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` if the email or password
    /// is wrong and `AdminAuthError::NotAdmin` if the account is a shopper.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentAdmin, AdminAuthError> {
        let email = Email::parse(email).map_err(|_| AdminAuthError::InvalidCredentials)?;

        let credentials = self
            .users
            .credentials(&email)
            .await?
            .ok_or(AdminAuthError::InvalidCredentials)?;

        verify_password(password, &credentials.password_hash)?;

        if !credentials.role.is_admin() {
            tracing::warn!(user_id = %credentials.id, "Non-admin attempted back-office login");
            return Err(AdminAuthError::NotAdmin);
        }

        Ok(CurrentAdmin {
            id: credentials.id,
            email: credentials.email,
            name: credentials.name,
        })
    }
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AdminAuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AdminAuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AdminAuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use argon2::PasswordHasher;
    use argon2::password_hash::{SaltString, rand_core::OsRng};

    use super::*;

    #[test]
    fn test_verify_storefront_hash() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"kanri-2024", &salt)
            .unwrap()
            .to_string();

        assert!(verify_password("kanri-2024", &hash).is_ok());
        assert!(matches!(
            verify_password("kanri-2025", &hash),
            Err(AdminAuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(matches!(
            verify_password("anything", ""),
            Err(AdminAuthError::InvalidCredentials)
        ));
    }
}
