//! Contact inbox queries.

use sqlx::PgPool;

use omoide_core::{ContactId, ContactStatus};

use super::{PageRequest, RepositoryError};
use crate::models::{Contact, ContactCounts, ContactUpdate};

const CONTACT_COLUMNS: &str =
    "id, name, email, subject, message, status, admin_note, created_at, updated_at";

/// Repository for the contact inbox.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Messages newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        status: Option<ContactStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Contact>, i64), RepositoryError> {
        let contacts = sqlx::query_as::<_, Contact>(&format!(
            r"
            SELECT {CONTACT_COLUMNS} FROM shop.contacts
            WHERE ($1::shop.contact_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.contacts WHERE ($1::shop.contact_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok((contacts, total))
    }

    /// Message count per status over the whole inbox.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self) -> Result<ContactCounts, RepositoryError> {
        let rows = sqlx::query_as::<_, (ContactStatus, i64)>(
            "SELECT status, COUNT(*) FROM shop.contacts GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(ContactCounts::from_rows(rows))
    }

    /// Open a message: returns it and flips UNREAD to READ.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn open(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            r"
            UPDATE shop.contacts SET status = 'read'
            WHERE id = $1 AND status = 'unread'
            RETURNING {CONTACT_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        if contact.is_some() {
            return Ok(contact);
        }

        let contact = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM shop.contacts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(contact)
    }

    /// Apply a partial update. Any status may follow any other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message does not exist.
    pub async fn update(
        &self,
        id: ContactId,
        update: &ContactUpdate,
    ) -> Result<Contact, RepositoryError> {
        let (set_note, note) = match &update.admin_note {
            Some(note) => (true, note.as_deref()),
            None => (false, None),
        };

        sqlx::query_as::<_, Contact>(&format!(
            r"
            UPDATE shop.contacts
            SET status = COALESCE($2, status),
                admin_note = CASE WHEN $3 THEN $4 ELSE admin_note END
            WHERE id = $1
            RETURNING {CONTACT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.status)
        .bind(set_note)
        .bind(note)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message does not exist.
    pub async fn delete(&self, id: ContactId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.contacts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
