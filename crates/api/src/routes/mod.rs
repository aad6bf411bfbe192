pub mod category;
pub mod genre;
pub mod health;
pub mod video;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /categories                       list, create
/// /categories/{id}                  get, update, delete
/// /categories/{id}/restore          restore (POST)
///
/// /genres                           list, create
/// /genres/{id}                      get, update, delete
/// /genres/{id}/restore              restore (POST)
///
/// /videos                           list, create (multipart or JSON)
/// /videos/{id}                      get, update (multipart or JSON), delete
/// /videos/{id}/restore              restore (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/categories", category::router())
        .nest("/genres", genre::router())
        .nest("/videos", video::router())
}
