//! Product administration queries.

use sqlx::PgPool;
use sqlx::types::Json;

use omoide_core::ProductId;

use super::{PageRequest, RepositoryError};
use crate::models::{Product, ProductInput};

const DUPLICATE_SLUG: &str = "このスラッグは既に使用されています";

macro_rules! select_product {
    () => {
        r"
        SELECT p.id, p.name, p.slug, p.description, p.price, p.stock,
               p.image_url, p.images, p.category_id, c.name AS category_name,
               p.is_active, p.is_featured, p.created_at, p.updated_at
        FROM shop.products p
        JOIN shop.categories c ON c.id = p.category_id
        "
    };
}

/// Repository for product administration.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product, active or not, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<Product>, i64), RepositoryError> {
        let products = sqlx::query_as::<_, Product>(concat!(
            select_product!(),
            "ORDER BY p.created_at DESC, p.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.products")
            .fetch_one(self.pool)
            .await?;

        Ok((products, total))
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(concat!(select_product!(), "WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Insert a product with its opening stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(
        &self,
        input: &ProductInput,
        stock: i32,
    ) -> Result<Product, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            INSERT INTO shop.products (
                name, slug, description, price, stock, image_url, images,
                category_id, is_active, is_featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(stock)
        .bind(input.image_url.as_deref())
        .bind(Json(&input.images))
        .bind(input.category_id)
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_SLUG))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a product's editable fields. Stock is left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.products
            SET name = $2, slug = $3, description = $4, price = $5, image_url = $6,
                images = $7, category_id = $8, is_active = $9, is_featured = $10
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.image_url.as_deref())
        .bind(Json(&input.images))
        .bind(input.category_id)
        .bind(input.is_active)
        .bind(input.is_featured)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_SLUG))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product that has never been ordered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if order lines still reference it.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    RepositoryError::Conflict(
                        "注文履歴のある商品は削除できません。非公開にしてください".to_string(),
                    )
                }
                other => RepositoryError::Database(other),
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add `quantity` units to stock and return the new level.
    ///
    /// A single conditional update: it only applies when the result still
    /// fits in the column.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if the increment would overflow.
    pub async fn restock(&self, id: ProductId, quantity: i32) -> Result<i32, RepositoryError> {
        let stock = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE shop.products
            SET stock = stock + $2
            WHERE id = $1 AND stock <= 2147483647 - $2
            RETURNING stock
            ",
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?;

        if let Some(stock) = stock {
            tracing::info!(product_id = %id, quantity, stock, "Product restocked");
            return Ok(stock);
        }

        match self.get(id).await? {
            Some(_) => Err(RepositoryError::Conflict(
                "在庫数が上限を超えます".to_string(),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }
}
