//! Account administration queries.

use sqlx::PgPool;

use omoide_core::{Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::{Credentials, UserSummary};

/// Repository for account administration.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every user, newest first, with how many orders each has placed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<UserSummary>, RepositoryError> {
        let users = sqlx::query_as::<_, UserSummary>(
            r"
            SELECT u.id, u.email, u.name, u.role, u.created_at,
                   COUNT(o.id) AS order_count
            FROM shop.users u
            LEFT JOIN shop.orders o ON o.user_id = u.id
            GROUP BY u.id
            ORDER BY u.created_at DESC, u.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Login data for an email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credentials(&self, email: &Email) -> Result<Option<Credentials>, RepositoryError> {
        let credentials = sqlx::query_as::<_, Credentials>(
            "SELECT id, email, name, role, password_hash FROM shop.users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(credentials)
    }

    /// Current role of a user, or `None` if the account is gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn role(&self, id: UserId) -> Result<Option<UserRole>, RepositoryError> {
        let role = sqlx::query_scalar("SELECT role FROM shop.users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(role)
    }

    /// Set a user's role and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<UserSummary, RepositoryError> {
        let result = sqlx::query("UPDATE shop.users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let user = sqlx::query_as::<_, UserSummary>(
            r"
            SELECT u.id, u.email, u.name, u.role, u.created_at,
                   (SELECT COUNT(*) FROM shop.orders o WHERE o.user_id = u.id) AS order_count
            FROM shop.users u
            WHERE u.id = $1
            ",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(user_id = %id, role = %role, "User role changed");
        Ok(user)
    }

    /// Grant ADMIN by email. Returns `false` when no such user exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn promote(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE shop.users SET role = 'admin' WHERE email = $1")
            .bind(email)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Grant ADMIN to the oldest account. Returns its email, or `None` when
    /// there are no users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn promote_first(&self) -> Result<Option<Email>, RepositoryError> {
        let email = sqlx::query_scalar::<_, Email>(
            r"
            UPDATE shop.users SET role = 'admin'
            WHERE id = (SELECT id FROM shop.users ORDER BY created_at, id LIMIT 1)
            RETURNING email
            ",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(email)
    }
}
