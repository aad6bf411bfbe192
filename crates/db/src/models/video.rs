//! Video entity model.
//!
//! Videos own up to four media files. The row stores only the content-derived
//! storage name of each; the bytes live in the file store under a directory
//! named after the video id.

use catalog_core::attributes::Attributes;
use catalog_core::types::{DbId, Timestamp};
use catalog_core::uploads::FileOwner;
use serde::Serialize;
use sqlx::FromRow;

use super::category::Category;
use super::genre::Genre;

/// A row from the `videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub year_launched: i16,
    pub opened: bool,
    /// Rating code (`L`, `10`, `12`, `14`, `16`, `18`).
    pub rating: String,
    /// Minutes.
    pub duration: i32,
    pub video_file: Option<String>,
    pub thumb_file: Option<String>,
    pub banner_file: Option<String>,
    pub trailer_file: Option<String>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Video {
    /// Stored file name for one of [`FileOwner::FILE_FIELDS`].
    pub fn file_name(&self, field: &str) -> Option<&str> {
        match field {
            "video_file" => self.video_file.as_deref(),
            "thumb_file" => self.thumb_file.as_deref(),
            "banner_file" => self.banner_file.as_deref(),
            "trailer_file" => self.trailer_file.as_deref(),
            _ => None,
        }
    }
}

impl FileOwner for Video {
    const FILE_FIELDS: &'static [&'static str] =
        &["video_file", "thumb_file", "banner_file", "trailer_file"];

    fn upload_dir(&self) -> String {
        self.id.to_string()
    }
}

/// A video enriched with its category and genre associations.
#[derive(Debug, Clone, Serialize)]
pub struct VideoWithRelations {
    #[serde(flatten)]
    pub video: Video,
    pub categories: Vec<Category>,
    pub genres: Vec<Genre>,
}

/// Storage names to write into the file columns. `None` leaves the column
/// as it is on update and NULL on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoFiles {
    pub video_file: Option<String>,
    pub thumb_file: Option<String>,
    pub banner_file: Option<String>,
    pub trailer_file: Option<String>,
}

impl VideoFiles {
    /// Read the file columns from attributes whose file values were already
    /// replaced by storage names. Blank or missing fields map to `None`.
    pub fn from_attributes(attributes: &Attributes) -> Self {
        let name = |field: &str| {
            attributes
                .get(field)
                .and_then(|value| value.as_text())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            video_file: name("video_file"),
            thumb_file: name("thumb_file"),
            banner_file: name("banner_file"),
            trailer_file: name("trailer_file"),
        }
    }
}
