//! Postgres-backed relation lookup used by video validation.

use async_trait::async_trait;
use catalog_core::types::DbId;
use catalog_core::validation::{CategoryGenrePair, RelationLookup};
use sqlx::PgPool;

use crate::repositories::{CategoryRepo, GenreRepo};

/// Answers relation questions straight from the `category_genre`,
/// `categories` and `genres` tables.
#[derive(Debug, Clone)]
pub struct PgRelationLookup {
    pool: PgPool,
}

impl PgRelationLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationLookup for PgRelationLookup {
    type Error = sqlx::Error;

    async fn find_category_genre_pairs(
        &self,
        category_ids: &[DbId],
        genre_ids: &[DbId],
    ) -> Result<Vec<CategoryGenrePair>, Self::Error> {
        let rows: Vec<(DbId, DbId)> = sqlx::query_as(
            "SELECT genre_id, category_id FROM category_genre
             WHERE genre_id = ANY($1) AND category_id = ANY($2)",
        )
        .bind(genre_ids)
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(genre_id, category_id)| CategoryGenrePair {
                genre_id,
                category_id,
            })
            .collect())
    }

    async fn existing_category_ids(&self, ids: &[DbId]) -> Result<Vec<DbId>, Self::Error> {
        CategoryRepo::existing_ids(&self.pool, ids).await
    }

    async fn existing_genre_ids(&self, ids: &[DbId]) -> Result<Vec<DbId>, Self::Error> {
        GenreRepo::existing_ids(&self.pool, ids).await
    }
}
