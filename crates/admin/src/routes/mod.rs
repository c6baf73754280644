//! HTTP route handlers for the back-office.
//!
//! Every route except login and logout requires [`RequireAdmin`].
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database)
//!
//! # Auth
//! POST /api/auth/login | /api/auth/logout
//! GET  /api/auth/me
//!
//! # Dashboard
//! GET  /api/dashboard               - Counts, recent products, low stock
//!
//! # Catalog
//! GET|POST       /api/products
//! GET|PUT|DELETE /api/products/{id}
//! POST           /api/products/{id}/restock
//! GET|POST       /api/categories
//! PUT|DELETE     /api/categories/{id}
//!
//! # Orders
//! GET  /api/orders                  - ?status=&page=&limit=
//! GET  /api/orders/{id}
//! PUT  /api/orders/{id}/status      - Cancelling restores stock
//! PUT  /api/orders/{id}/note
//!
//! # Users
//! GET  /api/users
//! PUT  /api/users/{id}/role
//!
//! # Contacts
//! GET  /api/contacts                - ?status=&page=&limit=
//! GET|PATCH|DELETE /api/contacts/{id}
//!
//! # Uploads
//! POST /api/upload                  - Presigned S3 PUT URLs
//! ```
//!
//! [`RequireAdmin`]: crate::middleware::RequireAdmin

pub mod auth;
pub mod categories;
pub mod contacts;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod upload;
pub mod users;

use axum::Router;
use serde::{Deserialize, Serialize};

use crate::db::{PageRequest, RepositoryError};
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::ValidationError;

/// `?page=&limit=` query.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    #[must_use]
    pub fn page(&self) -> PageRequest {
        PageRequest::from_query(self.page, self.limit)
    }
}

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

/// Parse an optional `?status=` filter. Empty or `ALL` means no filter.
///
/// # Errors
///
/// Returns a `status` validation error for an unknown value.
pub fn status_filter<S: std::str::FromStr>(
    raw: Option<&str>,
) -> Result<Option<S>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::single("status", "ステータスが不正です")),
    }
}

/// Give a repository `NotFound` the resource's own message.
pub(crate) fn not_found_as(err: RepositoryError, message: &str) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(message.to_string()),
        other => other.into(),
    }
}

/// `{"message": "..."}` body for deletes and updates.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Create all routes for the back-office.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(orders::router())
        .merge(users::router())
        .merge(contacts::router())
        .merge(upload::router())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let query = PageQuery {
            page: Some(3),
            limit: Some(25),
        };
        let p = Pagination::new(query.page(), 51);
        assert_eq!(p.page, 3);
        assert_eq!(p.limit, 25);
        assert_eq!(p.total_pages, 3);

        let p = Pagination::new(PageQuery::default().page(), 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 20);
        assert_eq!(p.total_pages, 0);
    }

    #[test]
    fn test_not_found_as() {
        match not_found_as(RepositoryError::NotFound, "商品が見つかりません") {
            AppError::NotFound(message) => assert_eq!(message, "商品が見つかりません"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            not_found_as(RepositoryError::Conflict("x".to_string()), "x"),
            AppError::Database(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn test_status_filter() {
        use omoide_core::{ContactStatus, OrderStatus};

        assert_eq!(status_filter::<OrderStatus>(None).unwrap(), None);
        assert_eq!(status_filter::<OrderStatus>(Some("")).unwrap(), None);
        assert_eq!(status_filter::<OrderStatus>(Some("ALL")).unwrap(), None);
        assert_eq!(
            status_filter::<OrderStatus>(Some("SHIPPED")).unwrap(),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(
            status_filter::<ContactStatus>(Some("in_progress")).unwrap(),
            Some(ContactStatus::InProgress)
        );
        let err = status_filter::<OrderStatus>(Some("LOST")).unwrap_err();
        assert_eq!(err.first_field(), Some("status"));
    }
}
