//! Liveness check for the catalog service.
//!
//! Mounted at the root rather than under `/api/v1` so load balancers can
//! reach it without knowing the API version.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when the database and media storage are both usable,
    /// `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// The storage root that uploads are written to and `/storage` serves
    /// from still exists.
    pub storage_healthy: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = catalog_db::health_check(&state.pool).await.is_ok();
    let storage_healthy = tokio::fs::try_exists(&state.config.storage_root)
        .await
        .unwrap_or(false);

    let status = if db_healthy && storage_healthy {
        "ok"
    } else {
        tracing::warn!(db_healthy, storage_healthy, "Catalog service degraded");
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        storage_healthy,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
