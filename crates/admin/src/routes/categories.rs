//! Category management route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Serialize;
use tracing::instrument;

use omoide_core::CategoryId;

use crate::db::CategoryRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Category, CategoryWithCount};
use crate::routes::{Message, not_found_as};
use crate::state::AppState;
use crate::validation::{CategoryForm, validate_category};

const NOT_FOUND: &str = "カテゴリが見つかりません";

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(index).post(create))
        .route("/api/categories/{id}", put(update).delete(destroy))
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<CategoryWithCount>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: Category,
}

/// All categories with their product counts.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<CategoryList>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(CategoryList { categories }))
}

/// Create a category.
///
/// # Errors
///
/// Returns 400 for invalid fields and 409 if the name or slug is taken.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    let input = validate_category(form)?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(CategoryResponse { category })))
}

/// Update a category.
///
/// # Errors
///
/// Returns 404 if the category does not exist, 400 for invalid fields and
/// 409 if the name or slug is taken.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<CategoryResponse>> {
    let input = validate_category(form)?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;

    tracing::info!(category_id = %id, "Category updated");
    Ok(Json(CategoryResponse { category }))
}

/// Delete a category with no products.
///
/// # Errors
///
/// Returns 404 if the category does not exist and 409 while products
/// still belong to it.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Message>> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found_as(e, NOT_FOUND))?;

    tracing::info!(category_id = %id, "Category deleted");
    Ok(Json(Message {
        message: "カテゴリを削除しました",
    }))
}
