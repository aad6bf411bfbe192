//! Repository for the `videos`, `category_video` and `genre_video` tables.
//!
//! Writes run inside a caller-owned transaction so the transaction
//! coordinator can insert the row, sync both relations and upload files
//! before deciding to commit or roll back.

use catalog_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use catalog_core::types::DbId;
use catalog_core::validation::video::VideoInput;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::category::Category;
use crate::models::genre::Genre;
use crate::models::video::{Video, VideoFiles, VideoWithRelations};

/// Column list for the `videos` table.
const COLUMNS: &str = "id, title, description, year_launched, opened, rating, duration, \
    video_file, thumb_file, banner_file, trailer_file, deleted_at, created_at, updated_at";

const CATEGORY_COLUMNS: &str =
    "c.id, c.name, c.description, c.is_active, c.deleted_at, c.created_at, c.updated_at";

const GENRE_COLUMNS: &str =
    "g.id, g.name, g.is_active, g.deleted_at, g.created_at, g.updated_at";

/// Provides CRUD operations for videos and their relations.
pub struct VideoRepo;

impl VideoRepo {
    /// Insert a video row inside `tx`. `opened` defaults to `false`.
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        input: &VideoInput,
        files: &VideoFiles,
    ) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos
                (title, description, year_launched, opened, rating, duration,
                 video_file, thumb_file, banner_file, trailer_file)
             VALUES ($1, $2, $3, COALESCE($4, false), $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.year_launched)
            .bind(input.opened)
            .bind(input.rating.code())
            .bind(input.duration)
            .bind(&files.video_file)
            .bind(&files.thumb_file)
            .bind(&files.banner_file)
            .bind(&files.trailer_file)
            .fetch_one(&mut **tx)
            .await
    }

    /// Update a live video row inside `tx`.
    ///
    /// Scalar fields are replaced; `opened` and each file column keep their
    /// current value when the corresponding input is `None`.
    pub async fn update_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        input: &VideoInput,
        files: &VideoFiles,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!(
            "UPDATE videos SET
                title = $2,
                description = $3,
                year_launched = $4,
                opened = COALESCE($5, opened),
                rating = $6,
                duration = $7,
                video_file = COALESCE($8, video_file),
                thumb_file = COALESCE($9, thumb_file),
                banner_file = COALESCE($10, banner_file),
                trailer_file = COALESCE($11, trailer_file)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.year_launched)
            .bind(input.opened)
            .bind(input.rating.code())
            .bind(input.duration)
            .bind(&files.video_file)
            .bind(&files.thumb_file)
            .bind(&files.banner_file)
            .bind(&files.trailer_file)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Find a video by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a video by ID, including soft-deleted rows.
    pub async fn find_by_id_include_deleted(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live video by ID, enriched with its categories and genres.
    pub async fn find_with_relations(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<VideoWithRelations>, sqlx::Error> {
        match Self::find_by_id(pool, id).await? {
            Some(video) => Ok(Some(Self::with_relations(pool, video).await?)),
            None => Ok(None),
        }
    }

    /// Attach categories and genres to an already-loaded video.
    pub async fn with_relations(
        pool: &PgPool,
        video: Video,
    ) -> Result<VideoWithRelations, sqlx::Error> {
        let categories = Self::categories_for_video(pool, video.id).await?;
        let genres = Self::genres_for_video(pool, video.id).await?;
        Ok(VideoWithRelations {
            video,
            categories,
            genres,
        })
    }

    /// List videos, newest first.
    pub async fn list(
        pool: &PgPool,
        include_deleted: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Video>, sqlx::Error> {
        let filter = if include_deleted {
            ""
        } else {
            "WHERE deleted_at IS NULL"
        };
        let query = format!(
            "SELECT {COLUMNS} FROM videos {filter}
             ORDER BY created_at DESC, id
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(clamp_limit(limit, DEFAULT_LIMIT, MAX_LIMIT))
            .bind(clamp_offset(offset))
            .fetch_all(pool)
            .await
    }

    /// Number of live videos.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM videos WHERE deleted_at IS NULL")
            .fetch_one(pool)
            .await
    }

    /// Soft-delete a video by ID. Stored files are kept so a restore is lossless.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE videos SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restore a soft-deleted video. Returns `true` if a row was restored.
    pub async fn restore(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE videos SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Relation helpers
    // -----------------------------------------------------------------------

    /// Live categories linked to a video.
    pub async fn categories_for_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS}
             FROM categories c
             JOIN category_video cv ON cv.category_id = c.id
             WHERE cv.video_id = $1 AND c.deleted_at IS NULL
             ORDER BY c.name"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }

    /// Live genres linked to a video.
    pub async fn genres_for_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<Genre>, sqlx::Error> {
        let query = format!(
            "SELECT {GENRE_COLUMNS}
             FROM genres g
             JOIN genre_video gv ON gv.genre_id = g.id
             WHERE gv.video_id = $1 AND g.deleted_at IS NULL
             ORDER BY g.name"
        );
        sqlx::query_as::<_, Genre>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }

    /// Replace the video's category links with exactly `category_ids`.
    pub async fn sync_categories_inner(
        tx: &mut Transaction<'_, Postgres>,
        video_id: DbId,
        category_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM category_video WHERE video_id = $1")
            .bind(video_id)
            .execute(&mut **tx)
            .await?;

        for &category_id in category_ids {
            sqlx::query(
                "INSERT INTO category_video (category_id, video_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(category_id)
            .bind(video_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Replace the video's genre links with exactly `genre_ids`.
    pub async fn sync_genres_inner(
        tx: &mut Transaction<'_, Postgres>,
        video_id: DbId,
        genre_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM genre_video WHERE video_id = $1")
            .bind(video_id)
            .execute(&mut **tx)
            .await?;

        for &genre_id in genre_ids {
            sqlx::query(
                "INSERT INTO genre_video (genre_id, video_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(genre_id)
            .bind(video_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}
