//! Contact inbox route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use omoide_core::{ContactId, ContactStatus};

use crate::db::{ContactRepository, PageRequest};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Contact, ContactCounts};
use crate::routes::{Message, Pagination, not_found_as, status_filter};
use crate::state::AppState;
use crate::validation::{ContactPatchForm, validate_contact_patch};

const NOT_FOUND: &str = "お問い合わせが見つかりません";

/// Build the contacts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/contacts", get(index))
        .route(
            "/api/contacts/{id}",
            get(show).patch(update).delete(destroy),
        )
}

/// `?status=&page=&limit=`
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ContactList {
    pub contacts: Vec<Contact>,
    pub pagination: Pagination,
    pub counts: ContactCounts,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub contact: Contact,
}

/// Messages newest first, with per-status totals for the filter tabs.
///
/// # Errors
///
/// Returns 400 for an unknown status filter.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ContactList>> {
    let status = status_filter::<ContactStatus>(query.status.as_deref())?;
    let page = PageRequest::from_query(query.page, query.limit);
    let repo = ContactRepository::new(state.pool());
    let ((contacts, total), counts) = tokio::try_join!(repo.list(status, page), repo.counts())?;

    Ok(Json(ContactList {
        contacts,
        pagination: Pagination::new(page, total),
        counts,
    }))
}

/// Open a message. An unread message becomes read.
///
/// # Errors
///
/// Returns 404 if the message does not exist.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
) -> Result<Json<ContactResponse>> {
    let contact = ContactRepository::new(state.pool())
        .open(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(ContactResponse { contact }))
}

/// Change a message's status or note.
///
/// # Errors
///
/// Returns 400 for an over-long note and 404 if the message does not exist.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    Json(form): Json<ContactPatchForm>,
) -> Result<Json<ContactResponse>> {
    let patch = validate_contact_patch(form)?;
    let contact = ContactRepository::new(state.pool())
        .update(id, &patch)
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;

    tracing::info!(contact_id = %id, status = %contact.status, "Contact updated");
    Ok(Json(ContactResponse { contact }))
}

/// Delete a message.
///
/// # Errors
///
/// Returns 404 if the message does not exist.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
) -> Result<Json<Message>> {
    ContactRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;

    tracing::info!(contact_id = %id, "Contact deleted");
    Ok(Json(Message {
        message: "お問い合わせを削除しました",
    }))
}
