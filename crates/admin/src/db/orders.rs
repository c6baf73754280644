//! Order administration queries.
//!
//! Status changes lock the order row, check the transition table, and when
//! the order is cancelled put its units back on the shelf, all in one
//! transaction.

use sqlx::PgPool;

use omoide_core::{OrderId, OrderStatus, ProductId};

use super::{PageRequest, RepositoryError};
use crate::models::{OrderDetail, OrderItem, OrderSummary};

/// Outcome of a status change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Units handed back to stock, summed over all lines.
    pub released_units: i64,
}

impl StatusChange {
    /// Whether anything was written.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Repository for order administration.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        let orders = sqlx::query_as::<_, OrderSummary>(
            r"
            SELECT o.id, o.user_id, u.email AS user_email, u.name AS user_name,
                   o.total_amount, o.status, o.created_at,
                   (SELECT COALESCE(SUM(i.quantity), 0)::bigint
                      FROM shop.order_items i WHERE i.order_id = o.id) AS item_count
            FROM shop.orders o
            JOIN shop.users u ON u.id = o.user_id
            WHERE ($1::shop.order_status IS NULL OR o.status = $1)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.orders WHERE ($1::shop.order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// Get an order with its items and customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let order = sqlx::query_as::<_, OrderDetail>(
            r"
            SELECT o.id, o.paypal_order_id, o.paypal_capture_id, o.total_amount,
                   o.shipping_fee, o.status, o.shipping_name, o.shipping_postal_code,
                   o.shipping_prefecture, o.shipping_city, o.shipping_address_line1,
                   o.shipping_address_line2, o.shipping_phone_number, o.admin_note,
                   o.created_at, o.updated_at,
                   o.user_id, u.email AS user_email, u.name AS user_name
            FROM shop.orders o
            JOIN shop.users u ON u.id = o.user_id
            WHERE o.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(mut order) = order else {
            return Ok(None);
        };

        order.items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT i.id, i.product_id, p.name AS product_name, i.quantity, i.price
            FROM shop.order_items i
            JOIN shop.products p ON p.id = i.product_id
            WHERE i.order_id = $1
            ORDER BY i.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(order))
    }

    /// Move an order to `to`.
    ///
    /// Setting the current status again is a no-op. Cancelling adds every
    /// line's quantity back to its product's stock before the commit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist and
    /// `RepositoryError::InvalidTransition` if the table forbids the change.
    pub async fn update_status(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<StatusChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let from: OrderStatus =
            sqlx::query_scalar("SELECT status FROM shop.orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !from.transition_to(to)? {
            tx.rollback().await?;
            return Ok(StatusChange {
                from,
                to,
                released_units: 0,
            });
        }

        let mut released_units = 0;
        if from.releases_stock(to) {
            // Ascending product id, the same lock order checkout uses
            let lines = sqlx::query_as::<_, (ProductId, i32)>(
                r"
                SELECT product_id, SUM(quantity)::integer
                FROM shop.order_items
                WHERE order_id = $1
                GROUP BY product_id
                ORDER BY product_id
                ",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            for (product_id, quantity) in lines {
                sqlx::query("UPDATE shop.products SET stock = stock + $2 WHERE id = $1")
                    .bind(product_id)
                    .bind(quantity)
                    .execute(&mut *tx)
                    .await?;
                released_units += i64::from(quantity);
            }
        }

        sqlx::query("UPDATE shop.orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(to)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %id,
            from = %from,
            to = %to,
            released_units,
            "Order status changed"
        );
        Ok(StatusChange {
            from,
            to,
            released_units,
        })
    }

    /// Replace the staff note on an order. Empty clears it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_note(
        &self,
        id: OrderId,
        note: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shop.orders SET admin_note = $2 WHERE id = $1")
            .bind(id)
            .bind(note)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_change_changed() {
        let change = StatusChange {
            from: OrderStatus::Pending,
            to: OrderStatus::Pending,
            released_units: 0,
        };
        assert!(!change.changed());

        let change = StatusChange {
            to: OrderStatus::Cancelled,
            released_units: 3,
            ..change
        };
        assert!(change.changed());
    }
}
