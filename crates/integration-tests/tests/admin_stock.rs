//! Integration tests for back-office operations that touch stock.

#![allow(clippy::unwrap_used)]

use omoide_admin::db::{CategoryRepository, OrderRepository, ProductRepository, RepositoryError};
use omoide_core::inventory::{ReservationPlan, StockRequest};
use omoide_core::{OrderStatus, ProductId};
use omoide_integration_tests::{
    create_category, create_product, create_user, place_order, stock_of, test_pool,
};

fn plan(lines: &[(ProductId, i32)]) -> ReservationPlan {
    ReservationPlan::new(lines.iter().map(|&(id, q)| StockRequest::new(id, q))).unwrap()
}

// =============================================================================
// Order status
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_cancel_restores_stock() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let a = create_product(&pool, category, 1000, 5).await.unwrap();
    let b = create_product(&pool, category, 2000, 3).await.unwrap();
    let user = create_user(&pool).await.unwrap();

    let order = place_order(&pool, user, &plan(&[(a, 2), (b, 3)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&pool, a).await.unwrap(), 3);
    assert_eq!(stock_of(&pool, b).await.unwrap(), 0);

    let orders = OrderRepository::new(&pool);
    let change = orders
        .update_status(order, OrderStatus::Cancelled)
        .await
        .unwrap();

    assert!(change.changed());
    assert_eq!(change.released_units, 5);
    assert_eq!(stock_of(&pool, a).await.unwrap(), 5);
    assert_eq!(stock_of(&pool, b).await.unwrap(), 3);

    let detail = orders.get(order).await.unwrap().unwrap();
    assert_eq!(detail.status, OrderStatus::Cancelled);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_repeated_cancel_does_not_restock_twice() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 4).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let order = place_order(&pool, user, &plan(&[(product, 4)]))
        .await
        .unwrap();

    let orders = OrderRepository::new(&pool);
    let (first, second) = tokio::join!(
        orders.update_status(order, OrderStatus::Cancelled),
        orders.update_status(order, OrderStatus::Cancelled),
    );

    let released = first.unwrap().released_units + second.unwrap().released_units;
    assert_eq!(released, 4);
    assert_eq!(stock_of(&pool, product).await.unwrap(), 4);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_illegal_transition_changes_nothing() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 2).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    let order = place_order(&pool, user, &plan(&[(product, 1)]))
        .await
        .unwrap();

    let orders = OrderRepository::new(&pool);
    orders
        .update_status(order, OrderStatus::Processing)
        .await
        .unwrap();
    orders
        .update_status(order, OrderStatus::Shipped)
        .await
        .unwrap();

    let err = orders
        .update_status(order, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::InvalidTransition(t)
            if t.from == OrderStatus::Shipped && t.to == OrderStatus::Cancelled
    ));
    assert_eq!(stock_of(&pool, product).await.unwrap(), 1);

    let detail = orders.get(order).await.unwrap().unwrap();
    assert_eq!(detail.status, OrderStatus::Shipped);
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_restock_adds_units() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 2).await.unwrap();

    let products = ProductRepository::new(&pool);
    assert_eq!(products.restock(product, 8).await.unwrap(), 10);
    assert!(matches!(
        products.restock(ProductId::new(i32::MAX), 1).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_ordered_product_cannot_be_deleted() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    let product = create_product(&pool, category, 1000, 2).await.unwrap();
    let user = create_user(&pool).await.unwrap();
    place_order(&pool, user, &plan(&[(product, 1)]))
        .await
        .unwrap();

    let err = ProductRepository::new(&pool)
        .delete(product)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_category_with_products_cannot_be_deleted() {
    let pool = test_pool().await.unwrap();
    let category = create_category(&pool).await.unwrap();
    create_product(&pool, category, 1000, 1).await.unwrap();

    let categories = CategoryRepository::new(&pool);
    match categories.delete(category).await {
        Err(RepositoryError::Conflict(message)) => assert!(message.contains("1個の商品")),
        other => panic!("expected Conflict, got {other:?}"),
    }

    let empty = create_category(&pool).await.unwrap();
    categories.delete(empty).await.unwrap();
    assert!(!categories.exists(empty).await.unwrap());
}
