//! Genre/category compatibility rule.
//!
//! A video may only carry genres that are linked (through `category_genre`)
//! to at least one of the categories submitted alongside them.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Message attached to `genres_id` when the rule fails.
pub const GENRES_HAS_CATEGORIES_MESSAGE: &str =
    "Each genre must be linked to at least one of the selected categories.";

/// One `category_genre` join row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryGenrePair {
    pub genre_id: DbId,
    pub category_id: DbId,
}

/// Read access to catalog relations needed during validation.
#[async_trait]
pub trait RelationLookup: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Join rows whose genre is in `genre_ids` and whose category is in
    /// `category_ids`.
    async fn find_category_genre_pairs(
        &self,
        category_ids: &[DbId],
        genre_ids: &[DbId],
    ) -> Result<Vec<CategoryGenrePair>, Self::Error>;

    /// The subset of `ids` naming categories that exist and are not
    /// soft-deleted.
    async fn existing_category_ids(&self, ids: &[DbId]) -> Result<Vec<DbId>, Self::Error>;

    /// The subset of `ids` naming genres that exist and are not soft-deleted.
    async fn existing_genre_ids(&self, ids: &[DbId]) -> Result<Vec<DbId>, Self::Error>;
}

/// Validates submitted genre IDs against a fixed set of category IDs.
#[derive(Debug, Clone)]
pub struct GenresHasCategoriesRule {
    categories_id: Vec<DbId>,
}

impl GenresHasCategoriesRule {
    pub fn new(categories_id: &[DbId]) -> Self {
        Self {
            categories_id: dedup(categories_id),
        }
    }

    /// Deduplicated category IDs, in first-seen order.
    pub fn categories_id(&self) -> &[DbId] {
        &self.categories_id
    }

    /// `Ok(true)` when every submitted genre has a linked category in the
    /// rule's category set.
    pub async fn passes<L: RelationLookup + ?Sized>(
        &self,
        genres_id: &[DbId],
        lookup: &L,
    ) -> Result<bool, L::Error> {
        let genres_id = dedup(genres_id);
        if self.categories_id.is_empty() || genres_id.is_empty() {
            return Ok(false);
        }

        let rows = lookup
            .find_category_genre_pairs(&self.categories_id, &genres_id)
            .await?;
        Ok(genres_covered(&genres_id, &rows))
    }
}

/// Pure decision: every genre in `genres_id` appears in at least one row.
///
/// An empty row set never passes.
pub fn genres_covered(genres_id: &[DbId], rows: &[CategoryGenrePair]) -> bool {
    if rows.is_empty() {
        return false;
    }
    let linked: HashSet<DbId> = rows.iter().map(|row| row.genre_id).collect();
    genres_id.iter().all(|id| linked.contains(id))
}

fn dedup(ids: &[DbId]) -> Vec<DbId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
