//! Route definitions for the `/videos` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::video;
use crate::state::AppState;

/// Routes mounted at `/videos`.
///
/// ```text
/// GET    /                -> list
/// POST   /                -> create (multipart or JSON)
/// GET    /{id}            -> get_by_id
/// PUT    /{id}            -> update (multipart or JSON)
/// DELETE /{id}            -> delete (soft)
/// POST   /{id}/restore    -> restore
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(video::list).post(video::create))
        .route(
            "/{id}",
            get(video::get_by_id)
                .put(video::update)
                .delete(video::delete),
        )
        .route("/{id}/restore", post(video::restore))
}
