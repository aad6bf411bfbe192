//! Field rules for video create/update submissions.
//!
//! Create and update share the same rules: every scalar field and both
//! relation lists are required on each submission, file fields are optional.

use crate::attributes::{AttributeValue, Attributes};
use crate::rating::Rating;
use crate::types::DbId;
use crate::uploads::UploadedFile;

use super::genres_categories::{GenresHasCategoriesRule, GENRES_HAS_CATEGORIES_MESSAGE};
use super::{FieldErrors, RelationLookup, ValidationFailure};

pub const TITLE_MAX_LENGTH: usize = 255;

/// Lowest accepted `year_launched`; the column CHECK allows 1000..=9999.
pub const YEAR_LAUNCHED_MIN: i16 = 1000;

/// 50 GiB, in kilobytes.
pub const VIDEO_FILE_MAX_SIZE_KB: u64 = 1024 * 1024 * 50;
/// 5 MiB, in kilobytes.
pub const THUMB_FILE_MAX_SIZE_KB: u64 = 1024 * 5;
/// 10 MiB, in kilobytes.
pub const BANNER_FILE_MAX_SIZE_KB: u64 = 1024 * 10;
/// 1 GiB, in kilobytes.
pub const TRAILER_FILE_MAX_SIZE_KB: u64 = 1024 * 1024;

/// Accepted content for a file field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Mp4Video,
    Image,
}

#[derive(Debug, Clone, Copy)]
pub struct FileRule {
    pub field: &'static str,
    pub kind: FileKind,
    pub max_size_kb: u64,
}

impl FileRule {
    /// Largest accepted size in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_kb * 1024
    }

    /// Sizes are compared in whole kilobytes, rounded up.
    pub fn exceeds(&self, size_bytes: u64) -> bool {
        size_bytes.div_ceil(1024) > self.max_size_kb
    }

    pub fn too_large_message(&self) -> String {
        format!(
            "The {} may not be greater than {} kilobytes.",
            humanize(self.field),
            self.max_size_kb
        )
    }
}

/// The rule for a file field, if it is one.
pub fn file_rule(field: &str) -> Option<FileRule> {
    VIDEO_FILE_RULES.into_iter().find(|rule| rule.field == field)
}

pub const VIDEO_FILE_RULES: [FileRule; 4] = [
    FileRule {
        field: "video_file",
        kind: FileKind::Mp4Video,
        max_size_kb: VIDEO_FILE_MAX_SIZE_KB,
    },
    FileRule {
        field: "thumb_file",
        kind: FileKind::Image,
        max_size_kb: THUMB_FILE_MAX_SIZE_KB,
    },
    FileRule {
        field: "banner_file",
        kind: FileKind::Image,
        max_size_kb: BANNER_FILE_MAX_SIZE_KB,
    },
    FileRule {
        field: "trailer_file",
        kind: FileKind::Mp4Video,
        max_size_kb: TRAILER_FILE_MAX_SIZE_KB,
    },
];

/// A video submission that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInput {
    pub title: String,
    pub description: String,
    pub year_launched: i16,
    pub rating: Rating,
    pub duration: i32,
    /// `None` when not submitted; persisted as `false` on create.
    pub opened: Option<bool>,
    pub categories_id: Vec<DbId>,
    pub genres_id: Vec<DbId>,
}

/// Validate a video submission.
///
/// Runs the synchronous field rules first, then the lookups: category and
/// genre existence (ignoring soft-deleted rows) and the genre/category
/// relation rule. All violations are collected before returning.
pub async fn validate_video<L: RelationLookup + ?Sized>(
    attributes: &Attributes,
    lookup: &L,
) -> Result<VideoInput, ValidationFailure<L::Error>> {
    let mut errors = FieldErrors::new();

    let title = required_text(attributes, "title", &mut errors).and_then(|title| {
        if title.chars().count() > TITLE_MAX_LENGTH {
            errors.add(
                "title",
                format!("The title may not be greater than {TITLE_MAX_LENGTH} characters."),
            );
            None
        } else {
            Some(title)
        }
    });
    let description = required_text(attributes, "description", &mut errors);
    let year_launched = required_text(attributes, "year_launched", &mut errors)
        .and_then(|raw| parse_year(&raw, &mut errors));
    let rating = required_text(attributes, "rating", &mut errors).and_then(|raw| {
        Rating::from_code(raw.trim())
            .map_err(|_| errors.add("rating", "The selected rating is invalid."))
            .ok()
    });
    let duration = required_text(attributes, "duration", &mut errors).and_then(|raw| {
        match raw.trim().parse::<i32>() {
            Ok(minutes) if minutes >= 0 => Some(minutes),
            Ok(_) => {
                errors.add("duration", "The duration must be at least 0.");
                None
            }
            Err(_) => {
                errors.add("duration", "The duration must be an integer.");
                None
            }
        }
    });
    let opened = optional_bool(attributes, "opened", &mut errors);
    let categories_id = required_id_list(attributes, "categories_id", &mut errors);
    let genres_id = required_id_list(attributes, "genres_id", &mut errors);

    for rule in VIDEO_FILE_RULES {
        check_file(attributes, rule, &mut errors);
    }

    if let Some(ids) = &categories_id {
        let existing = lookup
            .existing_category_ids(ids)
            .await
            .map_err(ValidationFailure::Lookup)?;
        if ids.iter().any(|id| !existing.contains(id)) {
            errors.add("categories_id", "The selected categories id is invalid.");
        }
    }
    if let Some(ids) = &genres_id {
        let existing = lookup
            .existing_genre_ids(ids)
            .await
            .map_err(ValidationFailure::Lookup)?;
        if ids.iter().any(|id| !existing.contains(id)) {
            errors.add("genres_id", "The selected genres id is invalid.");
        }
    }
    if let (Some(categories), Some(genres)) = (&categories_id, &genres_id) {
        let passes = GenresHasCategoriesRule::new(categories)
            .passes(genres, lookup)
            .await
            .map_err(ValidationFailure::Lookup)?;
        if !passes {
            errors.add("genres_id", GENRES_HAS_CATEGORIES_MESSAGE);
        }
    }

    if !errors.is_empty() {
        return Err(ValidationFailure::Invalid(errors));
    }

    match (
        title,
        description,
        year_launched,
        rating,
        duration,
        categories_id,
        genres_id,
    ) {
        (
            Some(title),
            Some(description),
            Some(year_launched),
            Some(rating),
            Some(duration),
            Some(categories_id),
            Some(genres_id),
        ) => Ok(VideoInput {
            title,
            description,
            year_launched,
            rating,
            duration,
            opened,
            categories_id,
            genres_id,
        }),
        // Every `None` above recorded an error, so this arm is only reached
        // if a rule forgot to.
        _ => {
            let mut errors = FieldErrors::new();
            errors.add("input", "The submission is incomplete.");
            Err(ValidationFailure::Invalid(errors))
        }
    }
}

fn humanize(field: &str) -> String {
    field.replace('_', " ")
}

fn required_text(attributes: &Attributes, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match attributes.get(field) {
        None => {
            errors.add(field, format!("The {} field is required.", humanize(field)));
            None
        }
        Some(value) if value.is_blank() => {
            errors.add(field, format!("The {} field is required.", humanize(field)));
            None
        }
        Some(AttributeValue::Text(text)) => Some(text.clone()),
        Some(_) => {
            errors.add(field, format!("The {} must be a string.", humanize(field)));
            None
        }
    }
}

fn parse_year(raw: &str, errors: &mut FieldErrors) -> Option<i16> {
    let raw = raw.trim();
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(year) = raw.parse::<i16>() {
            if year >= YEAR_LAUNCHED_MIN {
                return Some(year);
            }
            errors.add(
                "year_launched",
                format!("The year launched must be at least {YEAR_LAUNCHED_MIN}."),
            );
            return None;
        }
    }
    errors.add("year_launched", "The year launched does not match the format Y.");
    None
}

fn optional_bool(attributes: &Attributes, field: &str, errors: &mut FieldErrors) -> Option<bool> {
    let value = attributes.get(field)?;
    if value.is_blank() {
        return None;
    }
    match value.as_text().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => Some(true),
        Some("false" | "0") => Some(false),
        _ => {
            errors.add(
                field,
                format!("The {} field must be true or false.", humanize(field)),
            );
            None
        }
    }
}

fn required_id_list(
    attributes: &Attributes,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<Vec<DbId>> {
    let items = match attributes.get(field) {
        None => {
            errors.add(field, format!("The {} field is required.", humanize(field)));
            return None;
        }
        Some(value) if value.is_blank() => {
            errors.add(field, format!("The {} field is required.", humanize(field)));
            return None;
        }
        Some(AttributeValue::List(items)) => items,
        Some(_) => {
            errors.add(field, format!("The {} must be an array.", humanize(field)));
            return None;
        }
    };

    let parsed: Result<Vec<DbId>, _> = items.iter().map(|s| s.trim().parse::<DbId>()).collect();
    match parsed {
        Ok(ids) => Some(ids),
        Err(_) => {
            // A malformed id cannot name an existing row.
            errors.add(field, format!("The selected {} is invalid.", humanize(field)));
            None
        }
    }
}

fn check_file(attributes: &Attributes, rule: FileRule, errors: &mut FieldErrors) {
    let field = rule.field;
    let Some(value) = attributes.get(field) else {
        return;
    };
    if value.is_blank() {
        return;
    }
    let Some(file) = value.as_file() else {
        errors.add(field, format!("The {} must be a file.", humanize(field)));
        return;
    };

    if !matches_kind(file, rule.kind) {
        let message = match rule.kind {
            FileKind::Mp4Video => format!("The {} must be a file of type: video/mp4.", humanize(field)),
            FileKind::Image => format!("The {} must be an image.", humanize(field)),
        };
        errors.add(field, message);
    }

    if rule.exceeds(file.size() as u64) {
        errors.add(field, rule.too_large_message());
    }
}

fn matches_kind(file: &UploadedFile, kind: FileKind) -> bool {
    let Some(mime) = file.mime_type() else {
        return false;
    };
    match kind {
        FileKind::Mp4Video => mime == "video/mp4",
        FileKind::Image => matches!(
            mime.as_str(),
            "image/jpeg" | "image/png" | "image/gif" | "image/bmp" | "image/svg+xml" | "image/webp"
        ),
    }
}
