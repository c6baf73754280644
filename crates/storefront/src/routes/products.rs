//! Product route handlers, including the public stock check.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use omoide_core::ProductId;
use omoide_core::inventory::{MAX_QUANTITY, MIN_QUANTITY, StockLevel, StockRequest};

use crate::db::inventory::{self, StockCheck, StockSummary};
use crate::db::{PageRequest, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::routes::Pagination;
use crate::state::AppState;
use crate::validation::ValidationError;

/// Most lines a single stock check may ask about.
const MAX_CHECK_ITEMS: usize = 100;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(index))
        .route("/api/products/check-stock", post(check_stock))
        .route("/api/products/stock/{id}", get(stock))
        .route("/api/products/{slug}", get(show))
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Product listing filters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn page(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(default.page),
            limit: self.limit.unwrap_or(default.limit),
        }
    }
}

/// One page of products.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductList {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

/// A product with its current stock level.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub stock_level: StockLevel,
    pub stock_label: &'static str,
}

/// Stock check body.
#[derive(Debug, Deserialize)]
pub struct StockCheckRequest {
    pub items: Vec<StockRequest>,
}

/// Stock check result for every requested line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheckResponse {
    pub all_available: bool,
    pub results: Vec<StockCheck>,
    pub unavailable_products: Vec<StockCheck>,
}

impl StockCheckResponse {
    fn new(results: Vec<StockCheck>) -> Self {
        let unavailable_products: Vec<StockCheck> =
            results.iter().filter(|c| !c.available).cloned().collect();
        Self {
            all_available: unavailable_products.is_empty(),
            results,
            unavailable_products,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List products on sale.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductList>> {
    let page = query.page();
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let (products, total) = ProductRepository::new(state.pool())
        .list_active(category, page)
        .await?;

    Ok(Json(ProductList {
        products,
        pagination: Pagination::new(page, total),
    }))
}

/// Show a product that is on sale.
///
/// # Errors
///
/// Returns 404 if the product does not exist or is not on sale.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("商品が見つかりません".to_string()))?;

    let stock_level = product.stock_level();
    Ok(Json(ProductDetail {
        product,
        stock_level,
        stock_label: stock_level.label(),
    }))
}

/// Current stock of one product, for refreshing a cart line.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
pub async fn stock(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<StockSummary>> {
    inventory::stock_summary(state.pool(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("商品が見つかりません".to_string()))
}

/// Check whether the requested quantities are currently in stock.
///
/// Nothing is reserved; a cart that passes may still fail at capture.
///
/// # Errors
///
/// Returns 400 for an empty or malformed item list.
pub async fn check_stock(
    State(state): State<AppState>,
    Json(body): Json<StockCheckRequest>,
) -> Result<Json<StockCheckResponse>> {
    validate_stock_check(&body.items)?;
    let results = inventory::check_stock(state.pool(), &body.items).await?;
    Ok(Json(StockCheckResponse::new(results)))
}

fn validate_stock_check(items: &[StockRequest]) -> std::result::Result<(), ValidationError> {
    if items.is_empty() || items.len() > MAX_CHECK_ITEMS {
        return Err(ValidationError::single("items", "リクエストが不正です"));
    }
    if let Some(index) = items
        .iter()
        .position(|i| !(MIN_QUANTITY..=MAX_QUANTITY).contains(&i.quantity))
    {
        return Err(ValidationError::single(
            &format!("items[{index}].quantity"),
            "リクエストが不正です",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_stock_check() {
        let ok = [StockRequest::new(ProductId::new(1), 2)];
        assert!(validate_stock_check(&ok).is_ok());
        assert!(validate_stock_check(&[]).is_err());

        let bad = [
            StockRequest::new(ProductId::new(1), 1),
            StockRequest::new(ProductId::new(2), 0),
        ];
        let err = validate_stock_check(&bad).unwrap_err();
        assert_eq!(err.first_field(), Some("items[1].quantity"));
    }

    #[test]
    fn test_response_splits_unavailable() {
        let results = vec![
            StockCheck::new(StockRequest::new(ProductId::new(1), 1), Some((3, true))),
            StockCheck::new(StockRequest::new(ProductId::new(2), 1), Some((0, true))),
        ];
        let response = StockCheckResponse::new(results);
        assert!(!response.all_available);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.unavailable_products.len(), 1);
        assert_eq!(response.unavailable_products[0].product_id, ProductId::new(2));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["allAvailable"], false);
    }

    fn list_query(qs: &str) -> ListQuery {
        let uri: axum::http::Uri = format!("/api/products?{qs}").parse().unwrap();
        Query::<ListQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_list_query_page() {
        let query = list_query("category=game&page=2&limit=10");
        assert_eq!(query.category.as_deref(), Some("game"));
        assert_eq!(query.page().offset(), 10);

        let query = list_query("");
        assert_eq!(query.page().page, 1);
        assert_eq!(query.page().limit, 20);
    }
}
