//! Catalog types: categories and products.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;

use omoide_core::inventory::StockLevel;
use omoide_core::{CategoryId, ProductId, Yen};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A category with the number of products currently on sale in it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub product_count: i64,
}

/// A product as stored.
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
    pub category_slug: String,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.stock, self.is_active)
    }
}
