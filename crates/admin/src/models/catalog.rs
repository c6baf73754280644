//! Catalog rows and validated edit inputs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;

use omoide_core::inventory::StockLevel;
use omoide_core::{CategoryId, ProductId, Yen};

/// A category row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category with the number of products attached, active or not.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub product_count: i64,
}

/// A product row with its category name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Yen,
    pub stock: i32,
    pub image_url: Option<String>,
    pub images: Json<Vec<String>>,
    pub category_id: CategoryId,
    pub category_name: String,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.stock, self.is_active)
    }
}

/// Product fields written by create and update. Stock is only set on create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Yen,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub category_id: CategoryId,
    pub is_active: bool,
    pub is_featured: bool,
}

/// Category fields written by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}
