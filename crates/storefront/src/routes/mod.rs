//! HTTP route handlers for storefront.
//!
//! All bodies are JSON with camelCase keys.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Catalog
//! GET  /api/categories         - Categories with product counts
//! GET  /api/categories/{slug}  - Category and its active products
//! GET  /api/products           - Active products (?category=&page=&limit=)
//! GET  /api/products/{slug}    - Product detail with stock level
//! POST /api/products/check-stock - Batch stock check (no reservation)
//! GET  /api/products/stock/{id} - Live stock level of one product
//!
//! # Checkout (requires auth, except config)
//! GET  /api/checkout/config    - PayPal client ID, currency, shipping fee
//! POST /api/checkout/paypal/create-order  - Price cart and open PayPal order
//! POST /api/checkout/paypal/capture-order - Capture and place the order
//!
//! # Orders (requires auth)
//! GET  /api/orders             - Own orders
//! GET  /api/orders/{id}        - Order detail (owner or admin)
//!
//! # Contact
//! POST /api/contact            - Submit contact form
//!
//! # Auth
//! POST /api/auth/signup | /api/auth/login | /api/auth/logout
//! GET  /api/auth/me
//!
//! # Account (requires auth)
//! GET|PUT /api/user/profile
//! POST /api/user/password
//! ```

pub mod auth;
pub mod categories;
pub mod checkout;
pub mod contact;
pub mod orders;
pub mod products;
pub mod user;

use axum::Router;
use serde::Serialize;

use crate::db::PageRequest;
use crate::middleware::{api_rate_limiter, auth_rate_limiter, contact_rate_limiter};
use crate::state::AppState;

/// Paging metadata returned with listings.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    #[must_use]
    pub fn new(page: PageRequest, total: i64) -> Self {
        Self {
            page: page.page.max(1),
            limit: page.limit(),
            total,
            total_pages: page.total_pages(total),
        }
    }
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(categories::router())
        .merge(products::router())
        .merge(checkout::router())
        .merge(orders::router())
        .merge(auth::session_router())
        .merge(user::router())
        .layer(api_rate_limiter());

    Router::new()
        .merge(api)
        .merge(auth::router().layer(auth_rate_limiter()))
        .merge(contact::router().layer(contact_rate_limiter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(PageRequest { page: 2, limit: 10 }, 35);
        assert_eq!(p.page, 2);
        assert_eq!(p.limit, 10);
        assert_eq!(p.total_pages, 4);

        let p = Pagination::new(PageRequest { page: 0, limit: 500 }, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 100);
        assert_eq!(p.total_pages, 0);
    }
}
