//! Repository for the `genres` and `category_genre` tables.

use catalog_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use catalog_core::types::DbId;
use sqlx::PgPool;

use crate::models::category::Category;
use crate::models::genre::{CreateGenre, Genre, GenreWithCategories, UpdateGenre};

/// Column list for the `genres` table.
pub(crate) const COLUMNS: &str = "id, name, is_active, deleted_at, created_at, updated_at";

/// Column list for the `categories` table (used in JOIN queries).
const CATEGORY_COLUMNS: &str =
    "c.id, c.name, c.description, c.is_active, c.deleted_at, c.created_at, c.updated_at";

/// Provides CRUD operations for genres and their category links.
pub struct GenreRepo;

impl GenreRepo {
    /// Insert a new genre and link it to `input.categories_id` in one
    /// transaction.
    pub async fn create(pool: &PgPool, input: &CreateGenre) -> Result<Genre, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_query = format!(
            "INSERT INTO genres (name, is_active)
             VALUES ($1, COALESCE($2, true))
             RETURNING {COLUMNS}"
        );
        let genre = sqlx::query_as::<_, Genre>(&insert_query)
            .bind(&input.name)
            .bind(input.is_active)
            .fetch_one(&mut *tx)
            .await?;

        Self::set_categories_inner(&mut tx, genre.id, &input.categories_id).await?;

        tx.commit().await?;
        Ok(genre)
    }

    /// Find a genre by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Genre>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM genres WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Genre>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a genre by ID, including soft-deleted rows.
    pub async fn find_by_id_include_deleted(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Genre>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM genres WHERE id = $1");
        sqlx::query_as::<_, Genre>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live genre by ID, enriched with its categories.
    pub async fn find_with_categories(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GenreWithCategories>, sqlx::Error> {
        match Self::find_by_id(pool, id).await? {
            Some(genre) => {
                let categories = Self::categories_for_genre(pool, genre.id).await?;
                Ok(Some(GenreWithCategories { genre, categories }))
            }
            None => Ok(None),
        }
    }

    /// List genres, newest first.
    pub async fn list(
        pool: &PgPool,
        include_deleted: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Genre>, sqlx::Error> {
        let filter = if include_deleted {
            ""
        } else {
            "WHERE deleted_at IS NULL"
        };
        let query = format!(
            "SELECT {COLUMNS} FROM genres {filter}
             ORDER BY created_at DESC, id
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Genre>(&query)
            .bind(clamp_limit(limit, DEFAULT_LIMIT, MAX_LIMIT))
            .bind(clamp_offset(offset))
            .fetch_all(pool)
            .await
    }

    /// Update a genre. Only non-`None` fields are applied.
    ///
    /// If `categories_id` is `Some`, replaces all category links.
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGenre,
    ) -> Result<Option<Genre>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let update_query = format!(
            "UPDATE genres SET
                name = COALESCE($2, name),
                is_active = COALESCE($3, is_active)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        let genre = sqlx::query_as::<_, Genre>(&update_query)
            .bind(id)
            .bind(&input.name)
            .bind(input.is_active)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(ref genre) = genre {
            if let Some(ref categories_id) = input.categories_id {
                Self::set_categories_inner(&mut tx, genre.id, categories_id).await?;
            }
        }

        tx.commit().await?;
        Ok(genre)
    }

    /// Soft-delete a genre by ID. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE genres SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restore a soft-deleted genre. Returns `true` if a row was restored.
    pub async fn restore(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE genres SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// IDs from `ids` naming live (not soft-deleted) genres.
    pub async fn existing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM genres WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Category link helpers
    // -----------------------------------------------------------------------

    /// Live categories linked to a genre.
    pub async fn categories_for_genre(
        pool: &PgPool,
        genre_id: DbId,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS}
             FROM categories c
             JOIN category_genre cg ON cg.category_id = c.id
             WHERE cg.genre_id = $1 AND c.deleted_at IS NULL
             ORDER BY c.name"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(genre_id)
            .fetch_all(pool)
            .await
    }

    /// Replace category links within an existing transaction.
    async fn set_categories_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        genre_id: DbId,
        category_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM category_genre WHERE genre_id = $1")
            .bind(genre_id)
            .execute(&mut **tx)
            .await?;

        for &category_id in category_ids {
            sqlx::query(
                "INSERT INTO category_genre (category_id, genre_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(category_id)
            .bind(genre_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}
