//! File store adapter.
//!
//! Uploaded media are opaque blobs addressed by `(directory, name)`. The
//! [`FileStore`] trait is the only surface the upload manager talks to, so
//! the backend can be swapped (local disk in production, a temporary
//! directory or a failing stub in tests).

mod local;

pub use local::LocalFileStore;

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Blob storage keyed by directory and file name.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `data` to `directory/name`, replacing any existing blob.
    async fn put(&self, directory: &str, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Remove `directory/name`. Removing a missing blob is not an error.
    async fn delete(&self, directory: &str, name: &str) -> StorageResult<()>;

    async fn exists(&self, directory: &str, name: &str) -> StorageResult<bool>;
}

/// Reject keys that could escape the storage root.
pub(crate) fn validate_segment(segment: &str) -> StorageResult<()> {
    if segment.is_empty()
        || segment.contains("..")
        || segment.starts_with('/')
        || segment.contains('\\')
        || segment.contains('\0')
    {
        return Err(StorageError::InvalidKey(format!(
            "'{segment}' is not a valid storage path segment"
        )));
    }
    Ok(())
}
