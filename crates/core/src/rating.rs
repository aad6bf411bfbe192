//! Age rating classification for videos.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Fixed set of age ratings a video can carry.
///
/// Stored as its string code (`"L"`, `"10"`, ...) in the `videos.rating` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "L")]
    General,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "12")]
    Twelve,
    #[serde(rename = "14")]
    Fourteen,
    #[serde(rename = "16")]
    Sixteen,
    #[serde(rename = "18")]
    Eighteen,
}

impl Rating {
    /// Every rating, in ascending order of restriction.
    pub const ALL: [Rating; 6] = [
        Rating::General,
        Rating::Ten,
        Rating::Twelve,
        Rating::Fourteen,
        Rating::Sixteen,
        Rating::Eighteen,
    ];

    /// Parse from the stored/submitted code.
    pub fn from_code(code: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown rating '{code}'. Must be one of: {}",
                    Self::codes().join(", ")
                ))
            })
    }

    /// Database/API code.
    pub fn code(self) -> &'static str {
        match self {
            Self::General => "L",
            Self::Ten => "10",
            Self::Twelve => "12",
            Self::Fourteen => "14",
            Self::Sixteen => "16",
            Self::Eighteen => "18",
        }
    }

    pub fn codes() -> Vec<&'static str> {
        Self::ALL.iter().map(|r| r.code()).collect()
    }
}
