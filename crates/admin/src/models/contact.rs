//! Contact form submissions as seen by staff.

use chrono::{DateTime, Utc};
use serde::Serialize;

use omoide_core::{ContactId, ContactStatus};

/// A stored contact message.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Number of messages in each status, over the whole inbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ContactCounts {
    pub unread: i64,
    pub read: i64,
    pub in_progress: i64,
    pub resolved: i64,
}

impl ContactCounts {
    /// Build from `(status, count)` rows; missing statuses count as zero.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = (ContactStatus, i64)>) -> Self {
        let mut counts = Self::default();
        for (status, count) in rows {
            match status {
                ContactStatus::Unread => counts.unread = count,
                ContactStatus::Read => counts.read = count,
                ContactStatus::InProgress => counts.in_progress = count,
                ContactStatus::Resolved => counts.resolved = count,
            }
        }
        counts
    }
}

/// Partial update; `None` keeps the stored value.
///
/// `admin_note: Some(None)` clears the note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub status: Option<ContactStatus>,
    pub admin_note: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_fill_missing_with_zero() {
        let counts = ContactCounts::from_rows([
            (ContactStatus::Unread, 3),
            (ContactStatus::Resolved, 10),
        ]);
        assert_eq!(counts.unread, 3);
        assert_eq!(counts.read, 0);
        assert_eq!(counts.in_progress, 0);
        assert_eq!(counts.resolved, 10);
    }

    #[test]
    fn test_counts_serialize_by_status_name() {
        let counts = ContactCounts::from_rows([(ContactStatus::InProgress, 2)]);
        let json = serde_json::to_value(counts).unwrap_or_default();
        assert_eq!(json["IN_PROGRESS"], 2);
        assert_eq!(json["UNREAD"], 0);
    }
}
