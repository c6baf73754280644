//! Order management route handlers.
//!
//! Status changes follow the order transition table; a disallowed change is
//! a 409 that lists the statuses reachable from the current one.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use omoide_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, PageRequest};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{OrderDetail, OrderSummary};
use crate::routes::{Pagination, not_found_as, status_filter};
use crate::state::AppState;
use crate::validation::{NoteForm, ValidationError, validate_note};

const NOT_FOUND: &str = "注文が見つかりません";

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(index))
        .route("/api/orders/{id}", get(show))
        .route("/api/orders/{id}/status", put(update_status))
        .route("/api/orders/{id}/note", put(update_note))
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// `?status=&page=&limit=`
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<OrderSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: OrderDetail,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderStatusView {
    pub id: OrderId,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdated {
    pub message: &'static str,
    pub order: OrderStatusView,
    pub released_units: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdated {
    pub message: &'static str,
    pub admin_note: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Orders newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns 400 for an unknown status filter.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderList>> {
    let status = status_filter::<OrderStatus>(query.status.as_deref())?;
    let page = PageRequest::from_query(query.page, query.limit);
    let (orders, total) = OrderRepository::new(state.pool())
        .list(status, page)
        .await?;

    Ok(Json(OrderList {
        orders,
        pagination: Pagination::new(page, total),
    }))
}

/// Order detail with customer, shipping address and lines.
///
/// # Errors
///
/// Returns 404 if the order does not exist.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(OrderResponse { order }))
}

/// Move an order to a new status.
///
/// Cancelling puts every line's quantity back into stock in the same
/// transaction as the status write.
///
/// # Errors
///
/// Returns 400 for a missing or unknown status, 404 if the order does not
/// exist and 409 if the transition is not allowed.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(form): Json<StatusForm>,
) -> Result<Json<StatusUpdated>> {
    let to = parse_status(form.status.as_deref())?;
    let change = OrderRepository::new(state.pool())
        .update_status(id, to)
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;

    Ok(Json(StatusUpdated {
        message: if change.changed() {
            "ステータスを更新しました"
        } else {
            "ステータスは変更されていません"
        },
        order: OrderStatusView {
            id,
            status: change.to,
        },
        released_units: change.released_units,
    }))
}

/// Replace the staff note on an order.
///
/// # Errors
///
/// Returns 400 for an over-long note and 404 if the order does not exist.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn update_note(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(form): Json<NoteForm>,
) -> Result<Json<NoteUpdated>> {
    let admin_note = validate_note(form.admin_note)?;
    OrderRepository::new(state.pool())
        .update_note(id, admin_note.as_deref())
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;

    Ok(Json(NoteUpdated {
        message: "メモを更新しました",
        admin_note,
    }))
}

fn parse_status(raw: Option<&str>) -> std::result::Result<OrderStatus, ValidationError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ValidationError::single("status", "無効なステータスです"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(Some("CANCELLED")).unwrap(), OrderStatus::Cancelled);
        assert_eq!(parse_status(Some(" shipped ")).unwrap(), OrderStatus::Shipped);
        assert!(parse_status(None).is_err());
        assert!(parse_status(Some("")).is_err());
        assert_eq!(
            parse_status(Some("REFUNDED")).unwrap_err().first_field(),
            Some("status")
        );
    }
}
