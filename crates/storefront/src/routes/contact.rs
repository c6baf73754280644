//! Contact form route handler.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::Serialize;
use tracing::instrument;

use omoide_core::ContactId;

use crate::db::ContactRepository;
use crate::error::Result;
use crate::state::AppState;
use crate::validation::{ContactForm, validate_contact};

/// Build the contact router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/contact", post(submit))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactReceived {
    pub success: bool,
    pub contact_id: ContactId,
    pub message: &'static str,
}

/// Store a contact message, then send the auto-reply and the shop
/// notification in the background.
///
/// # Errors
///
/// Returns 400 with every invalid field, or 500 if the message cannot be stored.
#[instrument(skip(state, form))]
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<ContactReceived>)> {
    let contact = validate_contact(form)?;
    let contact_id = ContactRepository::new(state.pool()).insert(&contact).await?;
    tracing::info!(contact_id = %contact_id, "Contact message received");

    if let Some(email) = state.email() {
        email.notify_contact_received(contact_id, &contact);
    }

    Ok((
        StatusCode::CREATED,
        Json(ContactReceived {
            success: true,
            contact_id,
            message: "お問い合わせを受け付けました",
        }),
    ))
}
