//! Contact form storage.

use sqlx::PgPool;

use omoide_core::ContactId;

use super::RepositoryError;
use crate::models::NewContact;

/// Repository for contact form submissions.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a submission as unread.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, contact: &NewContact) -> Result<ContactId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ContactId>(
            r"
            INSERT INTO shop.contacts (name, email, subject, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.subject)
        .bind(&contact.message)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }
}
