//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Parameters accepted by every list endpoint
/// (`?limit=&offset=&include_deleted=`).
///
/// Values are clamped in the repository layer via `clamp_limit` /
/// `clamp_offset`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_deleted: bool,
}
