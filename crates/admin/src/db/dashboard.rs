//! Dashboard figures.

use serde::Serialize;
use sqlx::PgPool;

use omoide_core::ProductId;
use omoide_core::inventory::LOW_STOCK_THRESHOLD;

use super::RepositoryError;
use crate::models::Product;

/// Row counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub products: i64,
    pub categories: i64,
    pub users: i64,
    pub orders: i64,
    pub pending_orders: i64,
    pub unread_contacts: i64,
}

/// An active product at or below the low-stock threshold.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub stock: i32,
}

/// Repository for dashboard reads.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    /// Create a new dashboard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All dashboard counts in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self) -> Result<DashboardCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r"
            SELECT
                (SELECT COUNT(*) FROM shop.products) AS products,
                (SELECT COUNT(*) FROM shop.categories) AS categories,
                (SELECT COUNT(*) FROM shop.users) AS users,
                (SELECT COUNT(*) FROM shop.orders) AS orders,
                (SELECT COUNT(*) FROM shop.orders WHERE status = 'pending') AS pending_orders,
                (SELECT COUNT(*) FROM shop.contacts WHERE status = 'unread') AS unread_contacts
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }

    /// The most recently added products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_products(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT p.id, p.name, p.slug, p.description, p.price, p.stock,
                   p.image_url, p.images, p.category_id, c.name AS category_name,
                   p.is_active, p.is_featured, p.created_at, p.updated_at
            FROM shop.products p
            JOIN shop.categories c ON c.id = p.category_id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Active products that are sold out or running low, emptiest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, limit: i64) -> Result<Vec<LowStockProduct>, RepositoryError> {
        let products = sqlx::query_as::<_, LowStockProduct>(
            r"
            SELECT id, name, slug, stock
            FROM shop.products
            WHERE is_active AND stock <= $1
            ORDER BY stock, id
            LIMIT $2
            ",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }
}
