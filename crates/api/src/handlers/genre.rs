//! Handlers for the `/genres` resource.
//!
//! Create and update link the genre to categories in the same transaction
//! as the row write. Every linked category must exist and not be
//! soft-deleted.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use catalog_core::error::CoreError;
use catalog_core::types::DbId;
use catalog_db::models::genre::{CreateGenre, Genre, GenreWithCategories, UpdateGenre};
use catalog_db::repositories::{CategoryRepo, GenreRepo};
use catalog_db::DbPool;

use crate::error::{invalid_field, validate_input, AppError, AppResult};
use crate::query::ListParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Genre", id })
}

async fn ensure_categories_exist(pool: &DbPool, ids: &[DbId]) -> AppResult<()> {
    let existing = CategoryRepo::existing_ids(pool, ids).await?;
    if ids.iter().all(|id| existing.contains(id)) {
        Ok(())
    } else {
        Err(invalid_field(
            "categories_id",
            "The selected categories id is invalid.",
        ))
    }
}

async fn load(pool: &DbPool, id: DbId) -> AppResult<GenreWithCategories> {
    GenreRepo::find_with_categories(pool, id)
        .await?
        .ok_or_else(|| not_found(id))
}

/// POST /api/v1/genres
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateGenre>,
) -> AppResult<(StatusCode, Json<DataResponse<GenreWithCategories>>)> {
    validate_input(&input)?;
    ensure_categories_exist(&state.pool, &input.categories_id).await?;

    let genre = GenreRepo::create(&state.pool, &input).await?;
    tracing::info!(genre_id = %genre.id, categories = input.categories_id.len(), "Genre created");

    let genre = load(&state.pool, genre.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: genre })))
}

/// GET /api/v1/genres
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<Genre>>>> {
    let genres =
        GenreRepo::list(&state.pool, params.include_deleted, params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: genres }))
}

/// GET /api/v1/genres/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GenreWithCategories>>> {
    let genre = load(&state.pool, id).await?;
    Ok(Json(DataResponse { data: genre }))
}

/// PUT /api/v1/genres/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateGenre>,
) -> AppResult<Json<DataResponse<GenreWithCategories>>> {
    validate_input(&input)?;
    if let Some(ref categories_id) = input.categories_id {
        ensure_categories_exist(&state.pool, categories_id).await?;
    }

    GenreRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    let genre = load(&state.pool, id).await?;
    Ok(Json(DataResponse { data: genre }))
}

/// DELETE /api/v1/genres/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if GenreRepo::soft_delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// POST /api/v1/genres/{id}/restore
pub async fn restore(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GenreWithCategories>>> {
    if !GenreRepo::restore(&state.pool, id).await? {
        return Err(not_found(id));
    }
    let genre = load(&state.pool, id).await?;
    Ok(Json(DataResponse { data: genre }))
}
