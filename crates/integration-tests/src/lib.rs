//! Database integration tests for Omoide Uriba.
//!
//! # Running Tests
//!
//! ```bash
//! # Point at a disposable database; migrations are applied automatically
//! export TEST_DATABASE_URL=postgres://localhost/omoide_test
//!
//! cargo test -p omoide-integration-tests -- --ignored
//! ```
//!
//! Every test needs `PostgreSQL` and is `#[ignore]`d by default. Fixtures use
//! random slugs and emails so tests can share one database and run in
//! parallel.
//!
//! # Test Categories
//!
//! - `order_placement` - Stock reservation under concurrency, batch rollback,
//!   client total verification
//! - `admin_stock` - Cancellation restock, transition table, restock, deletes
//! - `checkout_capture` - Capture, refunds and replays through
//!   `CheckoutService::place_order` against [`paypal_stub::PayPalStub`]

pub mod paypal_stub;

use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use omoide_core::inventory::ReservationPlan;
use omoide_core::{CategoryId, OrderId, ProductId, UserId, Yen};
use omoide_storefront::db::inventory::{self, ReservationError};
use omoide_storefront::db::orders;
use omoide_storefront::models::{NewOrder, NewOrderItem, ShippingAddress};
use omoide_storefront::validation::CaptureForm;

/// Connect to `TEST_DATABASE_URL` (or `DATABASE_URL`) and apply migrations.
///
/// # Errors
///
/// Returns an error if no URL is set, the database is unreachable or a
/// migration fails.
pub async fn test_pool() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "TEST_DATABASE_URL not set")?;

    let pool = omoide_storefront::db::create_pool(&url).await?;
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;
    Ok(pool)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Insert a shopper account.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn create_user(pool: &PgPool) -> Result<UserId, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO shop.users (email, password_hash, name) VALUES ($1, 'x', 'テスト') RETURNING id",
    )
    .bind(format!("{}@example.com", unique("shopper")))
    .fetch_one(pool)
    .await
}

/// Insert an empty category.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn create_category(pool: &PgPool) -> Result<CategoryId, sqlx::Error> {
    let slug = unique("category");
    sqlx::query_scalar("INSERT INTO shop.categories (name, slug) VALUES ($1, $1) RETURNING id")
        .bind(slug)
        .fetch_one(pool)
        .await
}

/// Insert an active product with `stock` units at `price` yen.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn create_product(
    pool: &PgPool,
    category_id: CategoryId,
    price: i64,
    stock: i32,
) -> Result<ProductId, sqlx::Error> {
    let slug = unique("product");
    sqlx::query_scalar(
        r"
        INSERT INTO shop.products (name, slug, price, stock, category_id)
        VALUES ($1, $1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(slug)
    .bind(Decimal::from(price))
    .bind(stock)
    .bind(category_id)
    .fetch_one(pool)
    .await
}

/// Current stock of a product.
///
/// # Errors
///
/// Returns an error if the product does not exist.
pub async fn stock_of(pool: &PgPool, id: ProductId) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT stock FROM shop.products WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Number of orders a user has.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn order_count(pool: &PgPool, user_id: UserId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM shop.orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// A delivery address that passes validation.
#[must_use]
pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        name: "山田 太郎".to_owned(),
        postal_code: "150-0001".to_owned(),
        prefecture: "東京都".to_owned(),
        city: "渋谷区".to_owned(),
        address_line1: "神宮前1-2-3".to_owned(),
        address_line2: None,
        phone_number: "090-1234-5678".to_owned(),
    }
}

/// A fresh `PayPal` order id.
#[must_use]
pub fn paypal_order_id() -> String {
    unique("PAYPAL").to_uppercase()
}

/// Capture body for `quantity` units of one product at `price` yen plus
/// `shipping_fee`, claiming the matching total.
///
/// # Errors
///
/// Returns an error if the body does not deserialize.
pub fn capture_form(
    paypal_order_id: &str,
    product_id: ProductId,
    quantity: i32,
    price: i64,
    shipping_fee: i64,
) -> Result<CaptureForm, serde_json::Error> {
    let total = price * i64::from(quantity) + shipping_fee;
    serde_json::from_value(serde_json::json!({
        "paypalOrderId": paypal_order_id,
        "orderData": {
            "items": [{ "productId": product_id, "quantity": quantity, "price": price.to_string() }],
            "shippingAddress": shipping_address(),
            "shippingFee": shipping_fee.to_string(),
            "totalAmount": total.to_string(),
        },
    }))
}

/// Capture id stored on the order recorded for a `PayPal` order.
///
/// # Errors
///
/// Returns an error if no such order exists.
pub async fn recorded_capture_id(
    pool: &PgPool,
    paypal_order_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT paypal_capture_id FROM shop.orders WHERE paypal_order_id = $1")
        .bind(paypal_order_id)
        .fetch_one(pool)
        .await
}

/// Reserve `plan` and record an order for it in one transaction, the way a
/// captured checkout does. Each call uses a fresh payment reference.
///
/// # Errors
///
/// Returns `ReservationError::InsufficientStock` when any line cannot be
/// covered; nothing is written in that case.
pub async fn place_order(
    pool: &PgPool,
    user_id: UserId,
    plan: &ReservationPlan,
) -> Result<OrderId, ReservationError> {
    let mut tx = pool.begin().await?;

    if let Err(e) = inventory::reserve(&mut tx, plan).await {
        tx.rollback().await?;
        return Err(e);
    }

    let unit_price = Yen::from_whole(1000);
    let order = NewOrder {
        user_id,
        paypal_order_id: unique("PAYPAL"),
        paypal_capture_id: Some(unique("CAPTURE")),
        total_amount: unit_price.times(u32::try_from(plan.total_units()).unwrap_or(u32::MAX)),
        shipping_fee: Yen::ZERO,
        shipping_address: shipping_address(),
        items: plan
            .lines()
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id,
                quantity: line.quantity,
                price: unit_price,
            })
            .collect(),
    };
    let order_id = orders::insert_with_items(&mut tx, &order).await?;
    tx.commit().await?;
    Ok(order_id)
}
