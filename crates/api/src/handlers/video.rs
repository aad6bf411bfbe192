//! Handlers for the `/videos` resource.
//!
//! Create and update accept either `multipart/form-data` (with file parts)
//! or a JSON object and go through [`VideoSync`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use catalog_core::error::CoreError;
use catalog_core::types::DbId;
use catalog_core::uploads::UploadManager;
use catalog_db::models::video::{Video, VideoWithRelations};
use catalog_db::repositories::VideoRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extract::AttributesBody;
use crate::query::ListParams;
use crate::response::DataResponse;
use crate::services::VideoSync;
use crate::state::AppState;

/// A video with its relations and public URLs for each stored file.
#[derive(Debug, Serialize)]
pub struct VideoResource {
    #[serde(flatten)]
    pub video: VideoWithRelations,
    pub video_file_url: Option<String>,
    pub thumb_file_url: Option<String>,
    pub banner_file_url: Option<String>,
    pub trailer_file_url: Option<String>,
}

impl VideoResource {
    fn new(video: VideoWithRelations, uploads: &UploadManager) -> Self {
        let url = |name: &Option<String>| {
            name.as_deref()
                .and_then(|name| uploads.file_url(&video.video, name))
        };
        Self {
            video_file_url: url(&video.video.video_file),
            thumb_file_url: url(&video.video.thumb_file),
            banner_file_url: url(&video.video.banner_file),
            trailer_file_url: url(&video.video.trailer_file),
            video,
        }
    }
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Video", id })
}

async fn resource(state: &AppState, video: Video) -> AppResult<VideoResource> {
    let video = VideoRepo::with_relations(&state.pool, video).await?;
    Ok(VideoResource::new(video, &state.uploads))
}

/// POST /api/v1/videos
pub async fn create(
    State(state): State<AppState>,
    AttributesBody(attributes): AttributesBody,
) -> AppResult<(StatusCode, Json<DataResponse<VideoResource>>)> {
    let video = VideoSync::new(&state.pool, &state.uploads)
        .store(attributes)
        .await?;
    let data = resource(&state, video).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data })))
}

/// GET /api/v1/videos
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<VideoResource>>>> {
    let videos =
        VideoRepo::list(&state.pool, params.include_deleted, params.limit, params.offset).await?;

    let mut data = Vec::with_capacity(videos.len());
    for video in videos {
        data.push(resource(&state, video).await?);
    }
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/videos/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VideoResource>>> {
    let video = VideoRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let data = resource(&state, video).await?;
    Ok(Json(DataResponse { data }))
}

/// PUT /api/v1/videos/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AttributesBody(attributes): AttributesBody,
) -> AppResult<Json<DataResponse<VideoResource>>> {
    let existing = VideoRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let video = VideoSync::new(&state.pool, &state.uploads)
        .update(&existing, attributes)
        .await?;
    let data = resource(&state, video).await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/videos/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if VideoRepo::soft_delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// POST /api/v1/videos/{id}/restore
pub async fn restore(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VideoResource>>> {
    if !VideoRepo::restore(&state.pool, id).await? {
        return Err(not_found(id));
    }
    let video = VideoRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let data = resource(&state, video).await?;
    Ok(Json(DataResponse { data }))
}
