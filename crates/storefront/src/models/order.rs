//! Orders and their line items.
//!
//! Shipping fields and item prices are snapshots taken when the order is
//! placed; later edits to the user's profile or the product's price do not
//! change an existing order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use omoide_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId, Yen};

/// Delivery address copied onto the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[sqlx(rename = "shipping_name")]
    pub name: String,
    #[sqlx(rename = "shipping_postal_code")]
    pub postal_code: String,
    #[sqlx(rename = "shipping_prefecture")]
    pub prefecture: String,
    #[sqlx(rename = "shipping_city")]
    pub city: String,
    #[sqlx(rename = "shipping_address_line1")]
    pub address_line1: String,
    #[sqlx(rename = "shipping_address_line2")]
    #[serde(default)]
    pub address_line2: Option<String>,
    #[sqlx(rename = "shipping_phone_number")]
    pub phone_number: String,
}

/// A placed order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub paypal_order_id: String,
    pub total_amount: Yen,
    pub shipping_fee: Yen,
    pub status: OrderStatus,
    #[sqlx(flatten)]
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Sum of line subtotals, excluding shipping.
    #[must_use]
    pub fn item_total(&self) -> Yen {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}

/// One line of an order, with the product's current name for display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price at purchase time.
    pub price: Yen,
    pub product_name: String,
    pub product_slug: String,
    pub product_image_url: Option<String>,
}

impl OrderItem {
    #[must_use]
    pub fn subtotal(&self) -> Yen {
        self.price.times(u32::try_from(self.quantity).unwrap_or(0))
    }
}

/// Order row to insert, priced by the server.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub paypal_order_id: String,
    pub paypal_capture_id: Option<String>,
    pub total_amount: Yen,
    pub shipping_fee: Yen,
    pub shipping_address: ShippingAddress,
    pub items: Vec<NewOrderItem>,
}

/// Order line to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Yen,
}
