//! Order history route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use omoide_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(index))
        .route("/api/orders/{id}", get(show))
}

/// The current user's orders, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn index(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// One order with its items.
///
/// # Errors
///
/// Returns 404 if the order does not exist and 403 if it belongs to someone
/// else and the viewer is not an admin.
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("注文が見つかりません".to_string()))?;

    ensure_can_view(&user, &order)?;
    Ok(Json(order))
}

fn ensure_can_view(user: &CurrentUser, order: &Order) -> Result<()> {
    if order.user_id == user.id || user.is_admin() {
        Ok(())
    } else {
        tracing::warn!(order_id = %order.id, user_id = %user.id, "Order access denied");
        Err(AppError::Forbidden(
            "この注文にアクセスする権限がありません".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use omoide_core::{Email, OrderStatus, UserId, UserRole, Yen};

    use super::*;
    use crate::models::ShippingAddress;

    fn user(id: i32, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("shopper@example.com").unwrap(),
            name: None,
            role,
        }
    }

    fn order_of(user_id: i32) -> Order {
        Order {
            id: OrderId::new(10),
            user_id: UserId::new(user_id),
            paypal_order_id: "5O190127TN364715T".to_string(),
            total_amount: Yen::from_whole(2500),
            shipping_fee: Yen::from_whole(500),
            status: OrderStatus::Pending,
            shipping_address: ShippingAddress {
                name: "山田太郎".to_string(),
                postal_code: "123-4567".to_string(),
                prefecture: "東京都".to_string(),
                city: "渋谷区".to_string(),
                address_line1: "1-2-3".to_string(),
                address_line2: None,
                phone_number: "090-1234-5678".to_string(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: Vec::new(),
        }
    }

    #[test]
    fn test_owner_can_view() {
        assert!(ensure_can_view(&user(1, UserRole::User), &order_of(1)).is_ok());
    }

    #[test]
    fn test_admin_can_view_any() {
        assert!(ensure_can_view(&user(2, UserRole::Admin), &order_of(1)).is_ok());
    }

    #[test]
    fn test_other_user_is_forbidden() {
        let err = ensure_can_view(&user(2, UserRole::User), &order_of(1)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
