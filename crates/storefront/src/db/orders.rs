//! Order persistence.
//!
//! Inserts run on a caller-supplied connection so the order, its items and the
//! stock reservation commit or roll back together.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use omoide_core::{OrderId, UserId};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderItem};

const ORDER_COLUMNS: &str = r"
    id, user_id, paypal_order_id, total_amount, shipping_fee, status,
    shipping_name, shipping_postal_code, shipping_prefecture, shipping_city,
    shipping_address_line1, shipping_address_line2, shipping_phone_number,
    created_at, updated_at
";

/// Insert an order and its items.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if an order already exists for the
/// `PayPal` order ID, or `RepositoryError::Database` for other failures.
pub async fn insert_with_items(
    conn: &mut PgConnection,
    order: &NewOrder,
) -> Result<OrderId, RepositoryError> {
    let address = &order.shipping_address;
    let order_id = sqlx::query_scalar::<_, OrderId>(
        r"
        INSERT INTO shop.orders (
            user_id, paypal_order_id, paypal_capture_id, total_amount, shipping_fee,
            shipping_name, shipping_postal_code, shipping_prefecture, shipping_city,
            shipping_address_line1, shipping_address_line2, shipping_phone_number
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id
        ",
    )
    .bind(order.user_id)
    .bind(&order.paypal_order_id)
    .bind(order.paypal_capture_id.as_deref())
    .bind(order.total_amount)
    .bind(order.shipping_fee)
    .bind(&address.name)
    .bind(&address.postal_code)
    .bind(&address.prefecture)
    .bind(&address.city)
    .bind(&address.address_line1)
    .bind(address.address_line2.as_deref())
    .bind(&address.phone_number)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_unique(e, "order already recorded for payment"))?;

    for item in &order.items {
        sqlx::query(
            r"
            INSERT INTO shop.order_items (order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *conn)
        .await?;
    }

    Ok(order_id)
}

/// Repository for order reads.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the order recorded for a `PayPal` order, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_paypal_order_id(
        &self,
        paypal_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE paypal_order_id = $1"
        ))
        .bind(paypal_order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Get an order with its items. Ownership is checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(mut order) = order else {
            return Ok(None);
        };
        order.items = self.items_for(&[order.id]).await?;
        Ok(Some(order))
    }

    /// A user's orders, newest first, each with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in self.items_for(&ids).await? {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in &mut orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn items_for(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price,
                   p.name AS product_name, p.slug AS product_slug,
                   p.image_url AS product_image_url
            FROM shop.order_items oi
            JOIN shop.products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }
}
