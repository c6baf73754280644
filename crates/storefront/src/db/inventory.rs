//! Stock checks and reservations.
//!
//! Reservation is a conditional decrement, one statement per product:
//!
//! ```sql
//! UPDATE shop.products SET stock = stock - $q
//! WHERE id = $id AND stock >= $q AND is_active
//! ```
//!
//! Postgres applies each statement atomically against the current row, so two
//! checkouts racing for the last unit cannot both see `stock >= q`: one updates
//! a row, the other updates none and gets [`ReservationError::InsufficientStock`].
//! No application lock is taken. Callers run [`reserve`] on a transaction
//! connection so an insufficient line rolls back the lines before it.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use omoide_core::inventory::{ReservationPlan, StockLevel, StockRequest, Unavailability, judge};
use omoide_core::ProductId;

use super::RepositoryError;

/// Reservation failed.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Fewer units left than requested, or the product stopped selling.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ReservationError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Outcome of checking one requested line, without reserving anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheck {
    pub product_id: ProductId,
    pub available: bool,
    pub current_stock: i32,
    pub requested_quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Unavailability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StockCheck {
    pub(crate) fn new(request: StockRequest, product: Option<(i32, bool)>) -> Self {
        let reason = judge(product, request.quantity);
        let current_stock = product.map_or(0, |(stock, _)| stock);
        Self {
            product_id: request.product_id,
            available: reason.is_none(),
            current_stock,
            requested_quantity: request.quantity,
            reason,
            message: reason.map(|r| r.message(current_stock)),
        }
    }

    /// A line the database refused to reserve, described by the product row
    /// as read after the refusal.
    ///
    /// Stock can change between the refused decrement and the read, so a row
    /// that now looks sufficient is reported without a count.
    pub(crate) fn refused(request: StockRequest, product: Option<(i32, bool)>) -> Self {
        let current_stock = product.map_or(0, |(stock, _)| stock);
        let (reason, message) = match judge(product, request.quantity) {
            Some(reason) => (reason, reason.message(current_stock)),
            None => (Unavailability::Insufficient, REFUSED_MESSAGE.to_owned()),
        };
        Self {
            product_id: request.product_id,
            available: false,
            current_stock,
            requested_quantity: request.quantity,
            reason: Some(reason),
            message: Some(message),
        }
    }
}

const REFUSED_MESSAGE: &str = "在庫が不足しています";

/// Stock shown on a product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub product_id: ProductId,
    pub stock: i32,
    pub level: StockLevel,
    pub label: &'static str,
}

#[derive(sqlx::FromRow)]
struct StockRow {
    id: ProductId,
    stock: i32,
    is_active: bool,
}

/// Check each requested line against current stock. Nothing is mutated.
///
/// Results are in request order. A result that is `available` now may still
/// lose the race at reservation time.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn check_stock(
    pool: &PgPool,
    requests: &[StockRequest],
) -> Result<Vec<StockCheck>, RepositoryError> {
    let ids: Vec<ProductId> = requests.iter().map(|r| r.product_id).collect();
    let rows = sqlx::query_as::<_, StockRow>(
        r"
        SELECT id, stock, is_active
        FROM shop.products
        WHERE id = ANY($1)
        ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let by_id: HashMap<ProductId, (i32, bool)> = rows
        .into_iter()
        .map(|r| (r.id, (r.stock, r.is_active)))
        .collect();

    Ok(requests
        .iter()
        .map(|request| StockCheck::new(*request, by_id.get(&request.product_id).copied()))
        .collect())
}

/// Reserve every line of `plan` on the caller's connection.
///
/// Lines are applied in ascending product id. The first line that cannot be
/// satisfied stops the batch; the caller must roll back its transaction so
/// earlier decrements are discarded.
///
/// # Errors
///
/// Returns `ReservationError::InsufficientStock` with the failing product, or
/// `ReservationError::Repository` if a statement fails.
pub async fn reserve(
    conn: &mut PgConnection,
    plan: &ReservationPlan,
) -> Result<(), ReservationError> {
    for line in plan.lines() {
        let result = sqlx::query(
            r"
            UPDATE shop.products
            SET stock = stock - $2
            WHERE id = $1 AND stock >= $2 AND is_active
            ",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            tracing::info!(
                product_id = %line.product_id,
                quantity = line.quantity,
                "Reservation refused: insufficient stock"
            );
            return Err(ReservationError::InsufficientStock(line.product_id));
        }
    }
    Ok(())
}

/// Describe a line [`reserve`] refused, reading the product on the same
/// connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn explain_refusal(
    conn: &mut PgConnection,
    request: StockRequest,
) -> Result<StockCheck, RepositoryError> {
    let row = sqlx::query_as::<_, StockRow>(
        r"
        SELECT id, stock, is_active
        FROM shop.products
        WHERE id = $1
        ",
    )
    .bind(request.product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(StockCheck::refused(
        request,
        row.map(|r| (r.stock, r.is_active)),
    ))
}

/// Current stock level of a product, or `None` if it does not exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn stock_summary(
    pool: &PgPool,
    product_id: ProductId,
) -> Result<Option<StockSummary>, RepositoryError> {
    let row = sqlx::query_as::<_, StockRow>(
        r"
        SELECT id, stock, is_active
        FROM shop.products
        WHERE id = $1
        ",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| {
        let level = StockLevel::classify(r.stock, r.is_active);
        StockSummary {
            product_id: r.id,
            stock: r.stock,
            level,
            label: level.label(),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(id: i32, quantity: i32) -> StockRequest {
        StockRequest::new(ProductId::new(id), quantity)
    }

    #[test]
    fn test_check_missing_product() {
        let check = StockCheck::new(req(1, 2), None);
        assert!(!check.available);
        assert_eq!(check.current_stock, 0);
        assert_eq!(check.reason, Some(Unavailability::NotFound));
        assert_eq!(check.message.as_deref(), Some("商品が見つかりません"));
    }

    #[test]
    fn test_check_insufficient_reports_stock() {
        let check = StockCheck::new(req(1, 5), Some((3, true)));
        assert!(!check.available);
        assert_eq!(check.current_stock, 3);
        assert_eq!(
            check.message.as_deref(),
            Some("在庫が不足しています（在庫: 3個）")
        );
    }

    #[test]
    fn test_check_inactive_even_with_stock() {
        let check = StockCheck::new(req(1, 1), Some((50, false)));
        assert_eq!(check.reason, Some(Unavailability::Inactive));
    }

    #[test]
    fn test_refused_line_reports_real_stock() {
        let check = StockCheck::refused(req(4, 3), Some((1, true)));
        assert!(!check.available);
        assert_eq!(check.current_stock, 1);
        assert_eq!(
            check.message.as_deref(),
            Some("在庫が不足しています（在庫: 1個）")
        );
    }

    #[test]
    fn test_refused_line_without_shortfall_omits_count() {
        let check = StockCheck::refused(req(4, 2), Some((5, true)));
        assert!(!check.available);
        assert_eq!(check.reason, Some(Unavailability::Insufficient));
        assert_eq!(check.current_stock, 5);
        assert_eq!(check.message.as_deref(), Some("在庫が不足しています"));
    }

    #[test]
    fn test_refused_line_for_withdrawn_product() {
        let check = StockCheck::refused(req(4, 1), Some((8, false)));
        assert_eq!(check.reason, Some(Unavailability::Inactive));
        assert_eq!(
            check.message.as_deref(),
            Some("この商品は現在販売していません")
        );
    }

    #[test]
    fn test_check_available_has_no_message() {
        let check = StockCheck::new(req(1, 3), Some((3, true)));
        assert!(check.available);
        assert!(check.message.is_none());
        let json = serde_json::to_value(&check).unwrap_or_default();
        assert!(json.get("message").is_none());
        assert_eq!(json["requestedQuantity"], 3);
    }
}
