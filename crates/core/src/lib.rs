//! Domain logic for the video catalog.
//!
//! Everything here is free of database access: identifiers, error types,
//! field validation, the genre/category relation rule, content hashing and
//! the upload manager with its file store backends.

pub mod attributes;
pub mod error;
pub mod hashing;
pub mod pagination;
pub mod rating;
pub mod storage;
pub mod types;
pub mod uploads;
pub mod validation;
