//! Checkout route handlers.
//!
//! The browser's `PayPal` buttons call `create-order` when the shopper clicks
//! pay and `capture-order` once they approve. Both require a logged-in user.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use omoide_core::types::money::CURRENCY_CODE;
use omoide_core::{OrderId, OrderStatus, Yen};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::PreparedPayment;
use crate::state::AppState;
use crate::validation::{CaptureForm, CheckoutForm};

/// Build the checkout router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/checkout/config", get(config))
        .route("/api/checkout/paypal/create-order", post(create_order))
        .route("/api/checkout/paypal/capture-order", post(capture_order))
}

/// What the browser needs to render the `PayPal` buttons.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutConfig {
    pub client_id: String,
    pub currency: &'static str,
    pub shipping_fee: Yen,
}

/// Response to a successful capture.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub success: bool,
    pub order_id: OrderId,
    pub order: PlacedOrderSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrderSummary {
    pub id: OrderId,
    pub total_amount: Yen,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for PlacedOrder {
    fn from(order: Order) -> Self {
        Self {
            success: true,
            order_id: order.id,
            order: PlacedOrderSummary {
                id: order.id,
                total_amount: order.total_amount,
                status: order.status,
                created_at: order.created_at,
            },
        }
    }
}

/// `PayPal` client ID, currency and the flat shipping fee.
pub async fn config(State(state): State<AppState>) -> Json<CheckoutConfig> {
    Json(CheckoutConfig {
        client_id: state.paypal().client_id().to_string(),
        currency: CURRENCY_CODE,
        shipping_fee: state.config().shipping_fee,
    })
}

/// Price the cart on the server and open a `PayPal` order for it.
///
/// # Errors
///
/// Returns 400 for an invalid cart or a total that disagrees with the
/// server, 409 if stock is short, 502 if `PayPal` fails.
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn create_order(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<PreparedPayment>> {
    let prepared = state.checkout().prepare_payment(user.id, form).await?;
    tracing::info!(paypal_order_id = %prepared.paypal_order_id, "PayPal order created");
    Ok(Json(prepared))
}

/// Capture an approved `PayPal` order and record the purchase.
///
/// # Errors
///
/// Returns 402 if the payment did not complete and 409 if stock ran out
/// (the capture is refunded), plus the errors of `create_order`.
#[instrument(skip(state, form), fields(user_id = %user.id))]
pub async fn capture_order(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(form): Json<CaptureForm>,
) -> Result<Json<PlacedOrder>> {
    add_breadcrumb(
        "checkout",
        "Capture requested",
        Some(&[("paypal_order_id", form.paypal_order_id.as_str())]),
    );

    let order = state.checkout().place_order(user.id, form).await?;
    tracing::info!(order_id = %order.id, total = %order.total_amount, "Order placed");
    Ok(Json(order.into()))
}
