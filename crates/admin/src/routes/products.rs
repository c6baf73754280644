//! Product management route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use omoide_core::inventory::StockLevel;
use omoide_core::{CategoryId, ProductId};

use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::routes::{Message, PageQuery, Pagination, not_found_as};
use crate::state::AppState;
use crate::validation::{
    ProductForm, RestockForm, ValidationError, validate_product, validate_restock,
};

const NOT_FOUND: &str = "商品が見つかりません";

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(index).post(create))
        .route(
            "/api/products/{id}",
            get(show).put(update).delete(destroy),
        )
        .route("/api/products/{id}/restock", post(restock))
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductList {
    pub products: Vec<ProductView>,
    pub pagination: Pagination,
}

/// A product with its stock level, as listed in the back-office.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub stock_level: StockLevel,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            stock_level: product.stock_level(),
            product,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: ProductView,
}

#[derive(Debug, Serialize)]
pub struct Restocked {
    pub stock: i32,
}

// =============================================================================
// Handlers
// =============================================================================

/// List every product, active or not, newest first.
///
/// # Errors
///
/// Returns 500 if a query fails.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProductList>> {
    let page = query.page();
    let (products, total) = ProductRepository::new(state.pool()).list(page).await?;

    Ok(Json(ProductList {
        products: products.into_iter().map(ProductView::from).collect(),
        pagination: Pagination::new(page, total),
    }))
}

/// Show one product.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(ProductResponse {
        product: product.into(),
    }))
}

/// Create a product with its opening stock.
///
/// # Errors
///
/// Returns 400 for invalid fields or an unknown category and 409 if the
/// slug is taken.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let (input, stock) = validate_product(form)?;
    ensure_category(&state, input.category_id).await?;

    let product = ProductRepository::new(state.pool())
        .create(&input, stock)
        .await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, stock, "Product created");
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            product: product.into(),
        }),
    ))
}

/// Update a product's details. Stock is not editable here; use restock.
///
/// # Errors
///
/// Returns 404 if the product does not exist, 400 for invalid fields and
/// 409 if the slug is taken.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(form): Json<ProductForm>,
) -> Result<Json<ProductResponse>> {
    let (input, _) = validate_product(form)?;
    ensure_category(&state, input.category_id).await?;

    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;

    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(ProductResponse {
        product: product.into(),
    }))
}

/// Delete a product that has never been ordered.
///
/// # Errors
///
/// Returns 404 if the product does not exist and 409 if it appears in an order.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Message>> {
    ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;

    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(Message {
        message: "商品を削除しました",
    }))
}

/// Add units to a product's stock.
///
/// # Errors
///
/// Returns 400 for a quantity outside `1..=10000`, 404 if the product does
/// not exist and 409 if the new level would overflow.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn restock(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(form): Json<RestockForm>,
) -> Result<Json<Restocked>> {
    let quantity = validate_restock(form)?;
    let stock = ProductRepository::new(state.pool())
        .restock(id, quantity)
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;
    Ok(Json(Restocked { stock }))
}

async fn ensure_category(state: &AppState, id: CategoryId) -> Result<()> {
    if CategoryRepository::new(state.pool()).exists(id).await? {
        Ok(())
    } else {
        Err(ValidationError::single("categoryId", "カテゴリが見つかりません").into())
    }
}
