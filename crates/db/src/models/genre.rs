//! Genre entity model and DTOs.
//!
//! Genres belong to one or more categories through `category_genre`. Those
//! links decide which genres a video may carry for a given category set.

use catalog_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::category::Category;

/// A row from the `genres` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Genre {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A genre enriched with its linked categories.
#[derive(Debug, Clone, Serialize)]
pub struct GenreWithCategories {
    #[serde(flatten)]
    pub genre: Genre,
    pub categories: Vec<Category>,
}

/// DTO for creating a new genre.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGenre {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub is_active: Option<bool>,
    /// Categories the genre belongs to. At least one is required.
    #[validate(length(min = 1))]
    pub categories_id: Vec<DbId>,
}

/// DTO for updating an existing genre.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateGenre {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
    /// If `Some`, replaces all category links. If `None`, leaves them unchanged.
    #[validate(length(min = 1))]
    pub categories_id: Option<Vec<DbId>>,
}
