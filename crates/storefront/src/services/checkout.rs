//! Order placement.
//!
//! Two steps, driven by the browser's `PayPal` buttons:
//!
//! 1. [`CheckoutService::prepare_payment`] re-prices the cart from stored
//!    prices, rejects a client total that disagrees, checks stock without
//!    touching it and opens a `PayPal` order for the server's total.
//! 2. [`CheckoutService::place_order`] repeats the pricing, captures the
//!    payment, then in one transaction reserves stock and records the order.
//!    If that transaction fails the capture is refunded.
//!
//! Stock is only ever decremented by [`inventory::reserve`], inside the
//! order transaction.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use omoide_core::inventory::{PlanError, ReservationPlan, StockRequest};
use omoide_core::pricing::{AmountMismatch, PricedLine, Quote};
use omoide_core::{OrderId, ProductId, UserId, Yen};

use crate::db::inventory::{self, ReservationError, StockCheck};
use crate::db::orders::{self, OrderRepository};
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewOrder, NewOrderItem, Order, Product};
use crate::paypal::types::STATUS_COMPLETED;
use crate::paypal::{PayPalClient, PayPalError};
use crate::validation::{CaptureForm, CheckoutForm, ValidationError, validate_capture, validate_checkout};

/// Why an order could not be placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("商品が見つかりません: {0}")]
    ProductNotFound(ProductId),

    #[error("{name}は現在販売していません")]
    ProductInactive { product_id: ProductId, name: String },

    #[error(transparent)]
    AmountMismatch(#[from] AmountMismatch),

    /// One or more lines cannot be covered by current stock.
    #[error("在庫不足の商品があります")]
    InsufficientStock(Vec<StockCheck>),

    #[error("支払いが完了していません: {status}")]
    PaymentNotCompleted { status: String },

    /// The `PayPal` order was already used for another account's order.
    #[error("payment already recorded for another order")]
    PaymentAlreadyUsed,

    /// `PayPal` reports the order captured but no order records it yet,
    /// typically while a concurrent submit is still recording it.
    #[error("payment already captured: {paypal_order_id}")]
    PaymentAlreadyCaptured { paypal_order_id: String },

    #[error("PayPal error: {0}")]
    PayPal(#[from] PayPalError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<PlanError> for CheckoutError {
    fn from(e: PlanError) -> Self {
        Self::Validation(ValidationError::single("items", &e.to_string()))
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// `PayPal` order opened for a checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedPayment {
    #[serde(rename = "orderId")]
    pub paypal_order_id: String,
    pub status: String,
}

/// Order placement service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    paypal: &'a PayPalClient,
    shipping_fee: Yen,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service charging a flat `shipping_fee`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, paypal: &'a PayPalClient, shipping_fee: Yen) -> Self {
        Self {
            pool,
            paypal,
            shipping_fee,
        }
    }

    /// Validate and price a checkout, then open a `PayPal` order for it.
    ///
    /// Nothing in the database is modified.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `ProductNotFound`, `ProductInactive`,
    /// `AmountMismatch` or `InsufficientStock` for a bad cart, and `PayPal` or
    /// `Repository` for upstream failures.
    #[instrument(skip(self, form), fields(user_id = %user_id))]
    pub async fn prepare_payment(
        &self,
        user_id: UserId,
        mut form: CheckoutForm,
    ) -> Result<PreparedPayment, CheckoutError> {
        validate_checkout(&mut form)?;
        let (plan, quote) = self.quote(&form).await?;

        let unavailable: Vec<StockCheck> = inventory::check_stock(self.pool, plan.lines())
            .await?
            .into_iter()
            .filter(|c| !c.available)
            .collect();
        if !unavailable.is_empty() {
            return Err(CheckoutError::InsufficientStock(unavailable));
        }

        let order = self.paypal.create_order(&quote).await?;
        Ok(PreparedPayment {
            paypal_order_id: order.id,
            status: order.status,
        })
    }

    /// Capture an approved `PayPal` order and record the purchase.
    ///
    /// Placing the same `PayPal` order twice returns the order recorded the
    /// first time.
    ///
    /// # Errors
    ///
    /// Returns the cart errors of [`Self::prepare_payment`] before any payment
    /// is taken, `PaymentNotCompleted` if `PayPal` did not complete the
    /// capture, `PaymentAlreadyCaptured` if another request captured it and has
    /// not recorded the order yet, and `InsufficientStock` (with the payment
    /// refunded) if stock ran out between approval and capture.
    #[instrument(skip(self, form), fields(user_id = %user_id, paypal_order_id = %form.paypal_order_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        mut form: CaptureForm,
    ) -> Result<Order, CheckoutError> {
        validate_capture(&mut form)?;
        let orders = OrderRepository::new(self.pool);

        if let Some(existing) = orders.find_by_paypal_order_id(&form.paypal_order_id).await? {
            return self.load_existing(user_id, existing.id).await;
        }

        let (plan, quote) = self.quote(&form.order_data).await?;

        let capture = match self.paypal.capture_order(&form.paypal_order_id).await {
            Ok(capture) => capture,
            Err(PayPalError::Api { status: 422, message }) => {
                tracing::warn!(message = %message, "PayPal refused capture");
                return self.refused_capture(user_id, &form.paypal_order_id).await;
            }
            Err(e) => return Err(e.into()),
        };
        if !capture.is_completed() {
            return Err(CheckoutError::PaymentNotCompleted {
                status: capture.status,
            });
        }

        if !capture.captured(quote.total()) {
            tracing::error!(
                expected = %quote.total(),
                captured = ?capture.amount,
                "Captured amount does not match order total"
            );
            self.refund(capture.capture_id.as_deref()).await;
            return Err(CheckoutError::AmountMismatch(AmountMismatch {
                calculated: quote.total().amount(),
                received: capture
                    .amount
                    .as_ref()
                    .and_then(|m| m.value.parse::<Decimal>().ok())
                    .unwrap_or_default(),
            }));
        }

        let new_order = NewOrder {
            user_id,
            paypal_order_id: form.paypal_order_id.clone(),
            paypal_capture_id: capture.capture_id.clone(),
            total_amount: quote.total(),
            shipping_fee: quote.shipping_fee(),
            shipping_address: form.order_data.shipping_address,
            items: quote
                .lines()
                .iter()
                .map(|line| NewOrderItem {
                    product_id: line.product_id,
                    quantity: i32::try_from(line.quantity).unwrap_or(i32::MAX),
                    price: line.unit_price,
                })
                .collect(),
        };

        let order_id = match self.record(&plan, &new_order).await {
            Ok(order_id) => order_id,
            Err(CheckoutError::Repository(RepositoryError::Conflict(_))) => {
                // A concurrent request recorded this payment first; its order owns the capture.
                let existing = orders
                    .find_by_paypal_order_id(&form.paypal_order_id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                return self.load_existing(user_id, existing.id).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Order transaction failed after capture");
                self.refund(capture.capture_id.as_deref()).await;
                return Err(self.explain_reservation_failure(e, &plan).await);
            }
        };

        tracing::info!(order_id = %order_id, total = %quote.total(), "Order placed");
        orders
            .get(order_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound.into())
    }

    /// Reserve stock and insert the order in one transaction.
    async fn record(
        &self,
        plan: &ReservationPlan,
        new_order: &NewOrder,
    ) -> Result<OrderId, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        if let Err(e) = inventory::reserve(&mut tx, plan).await {
            let err = match e {
                ReservationError::InsufficientStock(product_id) => {
                    let request =
                        StockRequest::new(product_id, plan.quantity_of(product_id).unwrap_or(0));
                    let check = inventory::explain_refusal(&mut tx, request).await?;
                    CheckoutError::InsufficientStock(vec![check])
                }
                ReservationError::Repository(e) => CheckoutError::Repository(e),
            };
            tx.rollback().await?;
            return Err(err);
        }

        let order_id = orders::insert_with_items(&mut tx, new_order).await?;
        tx.commit().await?;
        Ok(order_id)
    }

    /// Replace a bare reservation failure with current per-line stock.
    async fn explain_reservation_failure(
        &self,
        e: CheckoutError,
        plan: &ReservationPlan,
    ) -> CheckoutError {
        let CheckoutError::InsufficientStock(fallback) = e else {
            return e;
        };
        match inventory::check_stock(self.pool, plan.lines()).await {
            Ok(checks) => {
                let unavailable: Vec<StockCheck> =
                    checks.into_iter().filter(|c| !c.available).collect();
                if unavailable.is_empty() {
                    CheckoutError::InsufficientStock(fallback)
                } else {
                    CheckoutError::InsufficientStock(unavailable)
                }
            }
            Err(_) => CheckoutError::InsufficientStock(fallback),
        }
    }

    /// Resolve a capture `PayPal` refused with 422.
    ///
    /// On a double submit the second capture loses to the first, which may
    /// already have recorded the order.
    async fn refused_capture(
        &self,
        user_id: UserId,
        paypal_order_id: &str,
    ) -> Result<Order, CheckoutError> {
        let recorded = OrderRepository::new(self.pool)
            .find_by_paypal_order_id(paypal_order_id)
            .await?;
        if let Some(existing) = recorded {
            return self.load_existing(user_id, existing.id).await;
        }

        let order = self.paypal.get_order(paypal_order_id).await?;
        if order.status == STATUS_COMPLETED {
            return Err(CheckoutError::PaymentAlreadyCaptured {
                paypal_order_id: paypal_order_id.to_owned(),
            });
        }
        Err(CheckoutError::PaymentNotCompleted {
            status: order.status,
        })
    }

    async fn refund(&self, capture_id: Option<&str>) {
        let Some(capture_id) = capture_id else {
            tracing::error!("Captured payment has no capture ID; manual refund required");
            return;
        };
        if let Err(e) = self.paypal.refund_capture(capture_id).await {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                error = %e,
                capture_id,
                sentry_event_id = %event_id,
                "Refund failed; manual refund required"
            );
        }
    }

    async fn load_existing(&self, user_id: UserId, order_id: OrderId) -> Result<Order, CheckoutError> {
        let order = OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if order.user_id != user_id {
            return Err(CheckoutError::PaymentAlreadyUsed);
        }
        tracing::info!(order_id = %order.id, "Payment already recorded; returning existing order");
        Ok(order)
    }

    /// Build the reservation plan and the server-side quote for a cart.
    async fn quote(&self, form: &CheckoutForm) -> Result<(ReservationPlan, Quote), CheckoutError> {
        if form.shipping_fee != self.shipping_fee.amount() {
            return Err(ValidationError::single("shippingFee", "配送料が正しくありません").into());
        }

        let plan = ReservationPlan::new(form.items.iter().copied().map(StockRequest::from))?;
        let products = ProductRepository::new(self.pool)
            .find_many(&plan.product_ids())
            .await?;

        let quote = price_plan(&plan, &products, self.shipping_fee)?;
        quote.verify_client_total(form.total_amount)?;
        Ok((plan, quote))
    }
}

/// Price every planned line at its stored price.
///
/// # Errors
///
/// Returns `ProductNotFound` or `ProductInactive` for the first line that
/// cannot be sold.
fn price_plan(
    plan: &ReservationPlan,
    products: &[Product],
    shipping_fee: Yen,
) -> Result<Quote, CheckoutError> {
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let lines = plan
        .lines()
        .iter()
        .map(|line| {
            let product = by_id
                .get(&line.product_id)
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;
            if !product.is_active {
                return Err(CheckoutError::ProductInactive {
                    product_id: product.id,
                    name: product.name.clone(),
                });
            }
            Ok(PricedLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: u32::try_from(line.quantity).unwrap_or(0),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Quote::new(lines, shipping_fee))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use omoide_core::CategoryId;
    use sqlx::types::Json;

    use super::*;

    fn product(id: i32, price: u32, is_active: bool) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("レトロ商品{id}"),
            slug: format!("retro-{id}"),
            description: None,
            price: Yen::from_whole(price),
            stock: 10,
            image_url: None,
            images: Json(Vec::new()),
            category_id: CategoryId::new(1),
            category_name: "ゲーム".to_string(),
            category_slug: "game".to_string(),
            is_active,
            is_featured: false,
            created_at: Utc::now(),
        }
    }

    fn plan(lines: &[(i32, i32)]) -> ReservationPlan {
        ReservationPlan::new(
            lines
                .iter()
                .map(|&(id, q)| StockRequest::new(ProductId::new(id), q)),
        )
        .unwrap()
    }

    #[test]
    fn test_prices_from_stored_products() {
        let quote = price_plan(&plan(&[(1, 2)]), &[product(1, 1000, true)], Yen::from_whole(500))
            .unwrap();
        assert_eq!(quote.total(), Yen::from_whole(2500));
        assert!(quote.verify_client_total(Decimal::from(2500)).is_ok());
        assert!(quote.verify_client_total(Decimal::from(1700)).is_err());
    }

    #[test]
    fn test_duplicate_lines_are_priced_once_merged() {
        let quote = price_plan(
            &plan(&[(2, 1), (1, 1), (2, 2)]),
            &[product(1, 300, true), product(2, 1000, true)],
            Yen::ZERO,
        )
        .unwrap();
        assert_eq!(quote.lines().len(), 2);
        assert_eq!(quote.item_total(), Yen::from_whole(3300));
    }

    #[test]
    fn test_missing_product() {
        let err = price_plan(&plan(&[(1, 1), (9, 1)]), &[product(1, 100, true)], Yen::ZERO)
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == ProductId::new(9)));
        assert_eq!(err.to_string(), "商品が見つかりません: 9");
    }

    #[test]
    fn test_inactive_product() {
        let err = price_plan(&plan(&[(3, 1)]), &[product(3, 100, false)], Yen::ZERO).unwrap_err();
        assert_eq!(err.to_string(), "レトロ商品3は現在販売していません");
    }

    #[test]
    fn test_plan_error_becomes_validation() {
        let err = CheckoutError::from(PlanError::Empty);
        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[test]
    fn test_prepared_payment_json() {
        let json = serde_json::to_value(PreparedPayment {
            paypal_order_id: "5O190127TN364715T".to_string(),
            status: "CREATED".to_string(),
        })
        .unwrap();
        assert_eq!(json["orderId"], "5O190127TN364715T");
        assert_eq!(json["status"], "CREATED");
    }
}
