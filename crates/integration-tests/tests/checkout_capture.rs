//! Integration tests for capturing a payment and recording the order.
//!
//! `CheckoutService::place_order` runs against a real database and a local
//! `PayPal` stand-in, so each test can check both what was written and which
//! refunds were requested.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use omoide_core::Yen;
use omoide_core::inventory::Unavailability;
use omoide_integration_tests::paypal_stub::{CaptureReply, PayPalStub, capture_id_for};
use omoide_integration_tests::{
    capture_form, create_category, create_product, create_user, order_count, paypal_order_id,
    recorded_capture_id, stock_of, test_pool,
};
use omoide_storefront::services::{CheckoutError, CheckoutService};

const SHIPPING_FEE: u32 = 500;

fn completed(amount: &str) -> CaptureReply {
    CaptureReply::Completed {
        amount: amount.to_owned(),
    }
}

// =============================================================================
// Successful capture
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_capture_records_order_and_takes_stock() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 3).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let stub = PayPalStub::start().await.unwrap();
    let paypal = stub.client().unwrap();
    let checkout = CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE));

    let order_id = paypal_order_id();
    stub.reply_to_capture(completed("2500"));
    let form = capture_form(&order_id, product, 2, 1000, 500).unwrap();

    let order = checkout.place_order(user, form).await.unwrap();

    assert_eq!(order.user_id, user);
    assert_eq!(order.paypal_order_id, order_id);
    assert_eq!(order.total_amount, Yen::from_whole(2500));
    assert_eq!(order.shipping_fee, Yen::from_whole(500));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(stock_of(&pool, product).await.unwrap(), 1);
    assert_eq!(
        recorded_capture_id(&pool, &order_id).await.unwrap(),
        Some(capture_id_for(&order_id))
    );
    assert!(stub.refunds().is_empty());
}

// =============================================================================
// Refunds
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_stock_lost_after_capture_is_refunded() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 1).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let stub = PayPalStub::start().await.unwrap();
    let paypal = stub.client().unwrap();
    let checkout = CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE));

    let order_id = paypal_order_id();
    stub.reply_to_capture(completed("2500"));
    let form = capture_form(&order_id, product, 2, 1000, 500).unwrap();

    let err = checkout.place_order(user, form).await.unwrap_err();

    match err {
        CheckoutError::InsufficientStock(unavailable) => {
            assert_eq!(unavailable.len(), 1);
            assert_eq!(unavailable[0].product_id, product);
            assert_eq!(unavailable[0].current_stock, 1);
            assert_eq!(unavailable[0].reason, Some(Unavailability::Insufficient));
            assert_eq!(
                unavailable[0].message.as_deref(),
                Some("在庫が不足しています（在庫: 1個）")
            );
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stub.refunds(), vec![capture_id_for(&order_id)]);
    assert_eq!(stock_of(&pool, product).await.unwrap(), 1);
    assert_eq!(order_count(&pool, user).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_short_capture_is_refunded() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 3).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let stub = PayPalStub::start().await.unwrap();
    let paypal = stub.client().unwrap();
    let checkout = CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE));

    let order_id = paypal_order_id();
    stub.reply_to_capture(completed("1500"));
    let form = capture_form(&order_id, product, 2, 1000, 500).unwrap();

    let err = checkout.place_order(user, form).await.unwrap_err();

    match err {
        CheckoutError::AmountMismatch(mismatch) => {
            assert_eq!(mismatch.calculated, Decimal::from(2500));
            assert_eq!(mismatch.received, Decimal::from(1500));
        }
        other => panic!("expected AmountMismatch, got {other:?}"),
    }
    assert_eq!(stub.refunds(), vec![capture_id_for(&order_id)]);
    assert_eq!(stock_of(&pool, product).await.unwrap(), 3);
    assert_eq!(order_count(&pool, user).await.unwrap(), 0);
}

// =============================================================================
// Replays
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_replayed_capture_returns_recorded_order() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 3).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let stub = PayPalStub::start().await.unwrap();
    let paypal = stub.client().unwrap();
    let checkout = CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE));

    let order_id = paypal_order_id();
    stub.reply_to_capture(completed("1500"));
    let first = checkout
        .place_order(user, capture_form(&order_id, product, 1, 1000, 500).unwrap())
        .await
        .unwrap();
    let second = checkout
        .place_order(user, capture_form(&order_id, product, 1, 1000, 500).unwrap())
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(stub.captures(), 1);
    assert_eq!(stock_of(&pool, product).await.unwrap(), 2);
    assert_eq!(order_count(&pool, user).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_payment_recorded_for_another_account_is_rejected() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 3).await.unwrap();
    let alice = create_user(&pool).await.unwrap();
    let mallory = create_user(&pool).await.unwrap();
    let stub = PayPalStub::start().await.unwrap();
    let paypal = stub.client().unwrap();
    let checkout = CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE));

    let order_id = paypal_order_id();
    stub.reply_to_capture(completed("1500"));
    checkout
        .place_order(alice, capture_form(&order_id, product, 1, 1000, 500).unwrap())
        .await
        .unwrap();

    let err = checkout
        .place_order(mallory, capture_form(&order_id, product, 1, 1000, 500).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::PaymentAlreadyUsed));
    assert_eq!(order_count(&pool, mallory).await.unwrap(), 0);
}

// =============================================================================
// Captures refused by PayPal
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_double_submit_returns_the_order_the_first_submit_recorded() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 3).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let stub = PayPalStub::start().await.unwrap();
    let paypal = stub.client().unwrap();

    let order_id = paypal_order_id();
    stub.reply_to_capture(CaptureReply::AlreadyCapturedOnRelease);
    stub.reply_to_capture(completed("1500"));

    // The slower submit reaches PayPal first and is held there.
    let slow = {
        let pool = pool.clone();
        let paypal = paypal.clone();
        let form = capture_form(&order_id, product, 1, 1000, 500).unwrap();
        tokio::spawn(async move {
            CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE))
                .place_order(user, form)
                .await
        })
    };
    stub.capture_arrived().await;

    let checkout = CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE));
    let recorded = checkout
        .place_order(user, capture_form(&order_id, product, 1, 1000, 500).unwrap())
        .await
        .unwrap();

    stub.release();
    let replayed = slow.await.unwrap().unwrap();

    assert_eq!(replayed.id, recorded.id);
    assert_eq!(stub.captures(), 2);
    assert!(stub.refunds().is_empty());
    assert_eq!(stock_of(&pool, product).await.unwrap(), 2);
    assert_eq!(order_count(&pool, user).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_capture_taken_elsewhere_is_reported_as_already_captured() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 3).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let stub = PayPalStub::start().await.unwrap();
    let paypal = stub.client().unwrap();
    let checkout = CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE));

    let order_id = paypal_order_id();
    stub.reply_to_capture(CaptureReply::AlreadyCaptured);
    stub.set_order_status("COMPLETED");

    let err = checkout
        .place_order(user, capture_form(&order_id, product, 1, 1000, 500).unwrap())
        .await
        .unwrap_err();

    match err {
        CheckoutError::PaymentAlreadyCaptured { paypal_order_id } => {
            assert_eq!(paypal_order_id, order_id);
        }
        other => panic!("expected PaymentAlreadyCaptured, got {other:?}"),
    }
    assert!(stub.refunds().is_empty());
    assert_eq!(stock_of(&pool, product).await.unwrap(), 3);
    assert_eq!(order_count(&pool, user).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_unapproved_payment_reports_its_status() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 3).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let stub = PayPalStub::start().await.unwrap();
    let paypal = stub.client().unwrap();
    let checkout = CheckoutService::new(&pool, &paypal, Yen::from_whole(SHIPPING_FEE));

    stub.reply_to_capture(CaptureReply::NotApproved);
    stub.set_order_status("PAYER_ACTION_REQUIRED");

    let err = checkout
        .place_order(
            user,
            capture_form(&paypal_order_id(), product, 1, 1000, 500).unwrap(),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::PaymentNotCompleted { status } => {
            assert_eq!(status, "PAYER_ACTION_REQUIRED");
        }
        other => panic!("expected PaymentNotCompleted, got {other:?}"),
    }
    assert!(stub.refunds().is_empty());
    assert_eq!(stock_of(&pool, product).await.unwrap(), 3);
}
