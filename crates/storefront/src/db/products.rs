//! Product catalog queries.

use sqlx::PgPool;

use omoide_core::ProductId;

use super::{PageRequest, RepositoryError};
use crate::models::Product;

macro_rules! select_product {
    () => {
        r"
        SELECT p.id, p.name, p.slug, p.description, p.price, p.stock,
               p.image_url, p.images, p.category_id,
               c.name AS category_name, c.slug AS category_slug,
               p.is_active, p.is_featured, p.created_at
        FROM shop.products p
        JOIN shop.categories c ON c.id = p.category_id
        "
    };
}

/// Repository for product reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products on sale, newest first, optionally within one category.
    ///
    /// Returns the page and the total number of matching products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_active(
        &self,
        category_slug: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let products = sqlx::query_as::<_, Product>(concat!(
            select_product!(),
            r"
            WHERE p.is_active
              AND ($1::text IS NULL OR c.slug = $1)
            ORDER BY p.is_featured DESC, p.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(category_slug)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM shop.products p
            JOIN shop.categories c ON c.id = p.category_id
            WHERE p.is_active
              AND ($1::text IS NULL OR c.slug = $1)
            ",
        )
        .bind(category_slug)
        .fetch_one(self.pool)
        .await?;

        Ok((products, total))
    }

    /// Get a product by slug, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(concat!(select_product!(), "WHERE p.slug = $1"))
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(concat!(select_product!(), "WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Load every product whose ID is in `ids`. Missing IDs are simply absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let products = sqlx::query_as::<_, Product>(concat!(
            select_product!(),
            "WHERE p.id = ANY($1) ORDER BY p.id"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }
}
