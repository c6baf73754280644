//! Orders as seen by staff.

use chrono::{DateTime, Utc};
use serde::Serialize;

use omoide_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId, Yen};

/// One row of the order list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_email: String,
    pub user_name: Option<String>,
    pub total_amount: Yen,
    pub status: OrderStatus,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Who placed an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    #[sqlx(rename = "user_id")]
    pub id: UserId,
    #[sqlx(rename = "user_email")]
    pub email: String,
    #[sqlx(rename = "user_name")]
    pub name: Option<String>,
}

/// Full order record including payment references and the admin note.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: OrderId,
    pub paypal_order_id: String,
    pub paypal_capture_id: Option<String>,
    pub total_amount: Yen,
    pub shipping_fee: Yen,
    pub status: OrderStatus,
    pub shipping_name: String,
    pub shipping_postal_code: String,
    pub shipping_prefecture: String,
    pub shipping_city: String,
    pub shipping_address_line1: String,
    pub shipping_address_line2: Option<String>,
    pub shipping_phone_number: String,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub customer: OrderCustomer,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// Unit price at purchase time.
    pub price: Yen,
}
