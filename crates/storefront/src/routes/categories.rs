//! Category route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Serialize;

use crate::db::{CategoryRepository, PageRequest, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::{Category, CategorySummary, Product};
use crate::routes::Pagination;
use crate::state::AppState;

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(index))
        .route("/api/categories/{slug}", get(show))
}

/// A category and one page of its products.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    pub category: Category,
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

/// List categories with the number of products on sale in each.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<CategorySummary>>> {
    let categories = CategoryRepository::new(state.pool())
        .list_with_counts()
        .await?;
    Ok(Json(categories))
}

/// Show a category and its active products.
///
/// # Errors
///
/// Returns 404 if no category has this slug.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<Json<CategoryDetail>> {
    let category = CategoryRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("カテゴリーが見つかりません".to_string()))?;

    let (products, total) = ProductRepository::new(state.pool())
        .list_active(Some(&category.slug), page)
        .await?;

    Ok(Json(CategoryDetail {
        category,
        products,
        pagination: Pagination::new(page, total),
    }))
}
