//! Category administration queries.

use sqlx::PgPool;

use omoide_core::CategoryId;

use super::RepositoryError;
use crate::models::{Category, CategoryInput, CategoryWithCount};

const DUPLICATE_CATEGORY: &str = "このスラッグまたはカテゴリ名は既に使用されています";

const CATEGORY_COLUMNS: &str =
    "c.id, c.name, c.slug, c.description, c.image_url, c.created_at, c.updated_at";

/// Repository for category administration.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every category by name, with its product count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<CategoryWithCount>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(&format!(
            r"
            SELECT {CATEGORY_COLUMNS}, COUNT(p.id) AS product_count
            FROM shop.categories c
            LEFT JOIN shop.products p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            "
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM shop.categories c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(category)
    }

    /// Whether a category exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shop.categories WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r"
            INSERT INTO shop.categories AS c (name, slug, description, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_CATEGORY))?;
        Ok(category)
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist and
    /// `RepositoryError::Conflict` if the new name or slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            r"
            UPDATE shop.categories AS c
            SET name = $2, slug = $3, description = $4, image_url = $5
            WHERE c.id = $1
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_CATEGORY))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an empty category.
    ///
    /// The emptiness check and the delete are one statement, so a product
    /// added concurrently either blocks the delete or fails its foreign key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist and
    /// `RepositoryError::Conflict` if products still belong to it.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.categories c
            WHERE c.id = $1
              AND NOT EXISTS (SELECT 1 FROM shop.products p WHERE p.category_id = c.id)
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let products: Option<i64> = sqlx::query_scalar(
            r"
            SELECT (SELECT COUNT(*) FROM shop.products p WHERE p.category_id = c.id)
            FROM shop.categories c
            WHERE c.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match products {
            Some(count) => Err(RepositoryError::Conflict(format!(
                "このカテゴリには{count}個の商品が紐付いています。先に商品を削除または別のカテゴリに移動してください。"
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }

    /// Insert or rename the default categories, keyed by slug.
    ///
    /// Returns how many rows were written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn upsert_defaults(&self, defaults: &[(&str, &str)]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for (name, slug) in defaults {
            written += sqlx::query(
                r"
                INSERT INTO shop.categories (name, slug)
                VALUES ($1, $2)
                ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
                ",
            )
            .bind(name)
            .bind(slug)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }
}
