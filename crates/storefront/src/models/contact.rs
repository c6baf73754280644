//! Contact form submissions.

use omoide_core::Email;

/// A validated contact form submission.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: Email,
    pub subject: String,
    pub message: String,
}
