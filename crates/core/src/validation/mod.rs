//! Request validation.
//!
//! Field rules for video submissions and the genre/category relation rule.
//! Database access is injected through [`RelationLookup`]; everything else
//! is pure logic.

pub mod genres_categories;
pub mod video;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub use genres_categories::{
    genres_covered, CategoryGenrePair, GenresHasCategoriesRule, RelationLookup,
};

/// Field name to the list of messages describing why it was rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Why a submission could not be validated: either the input is invalid, or
/// a lookup needed to decide failed.
#[derive(Debug, thiserror::Error)]
pub enum ValidationFailure<E> {
    #[error("Validation failed for fields: {0}")]
    Invalid(FieldErrors),

    #[error("Validation lookup failed: {0}")]
    Lookup(#[source] E),
}
