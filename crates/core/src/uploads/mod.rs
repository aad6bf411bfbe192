//! Upload manager.
//!
//! Entities that own media declare their file fields and storage directory
//! through [`FileOwner`]. A single [`UploadManager`] then handles extracting
//! files from submitted attributes, writing them to the [`FileStore`] and
//! removing superseded ones.

mod file;

pub use file::UploadedFile;

use std::borrow::Cow;
use std::sync::Arc;

use crate::attributes::{AttributeValue, Attributes};
use crate::storage::{FileStore, StorageError, StorageResult};

/// An entity type that stores uploaded files.
pub trait FileOwner {
    /// Attribute names that carry files for this entity.
    const FILE_FIELDS: &'static [&'static str];

    /// Directory (relative to the store root) holding this entity's files.
    fn upload_dir(&self) -> String;
}

/// A stored file referenced either by its storage name or by the upload
/// that produced it.
#[derive(Debug, Clone, Copy)]
pub enum StoredFile<'a> {
    Name(&'a str),
    Upload(&'a UploadedFile),
}

impl StoredFile<'_> {
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Self::Name(name) => Cow::Borrowed(name),
            Self::Upload(file) => Cow::Owned(file.hash_name()),
        }
    }
}

impl<'a> From<&'a str> for StoredFile<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for StoredFile<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}

impl<'a> From<&'a UploadedFile> for StoredFile<'a> {
    fn from(file: &'a UploadedFile) -> Self {
        Self::Upload(file)
    }
}

/// Replace every file value of a recognised file field with its storage
/// name, returning the files in encounter order.
///
/// Unrecognised fields and fields already holding plain values are left
/// untouched.
pub fn extract_files<O: FileOwner>(attributes: &mut Attributes) -> Vec<UploadedFile> {
    let mut files = Vec::new();
    for (key, value) in attributes.iter_mut() {
        if !O::FILE_FIELDS.contains(&key.as_str()) {
            continue;
        }
        match std::mem::replace(value, AttributeValue::Null) {
            AttributeValue::File(file) => {
                *value = AttributeValue::Text(file.hash_name());
                files.push(file);
            }
            other => *value = other,
        }
    }
    files
}

/// Storage path of `name` under the owner's directory. Pure string
/// composition.
pub fn relative_file_path<O: FileOwner>(owner: &O, name: &str) -> String {
    format!("{}/{name}", owner.upload_dir())
}

/// Writes and removes owner files through a [`FileStore`].
#[derive(Clone)]
pub struct UploadManager {
    store: Arc<dyn FileStore>,
    public_base_url: Option<String>,
}

impl UploadManager {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self {
            store,
            public_base_url: None,
        }
    }

    /// Base URL used by [`UploadManager::file_url`] (e.g.
    /// `http://localhost:3000/storage`).
    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub async fn upload_file<O: FileOwner>(
        &self,
        owner: &O,
        file: &UploadedFile,
    ) -> StorageResult<()> {
        let directory = owner.upload_dir();
        let name = file.hash_name();
        self.store.put(&directory, &name, file.data()).await?;
        tracing::info!(
            directory = %directory,
            name = %name,
            original_name = %file.original_name(),
            size_bytes = file.size(),
            "Uploaded file"
        );
        Ok(())
    }

    /// Upload each file in order, stopping at the first failure.
    pub async fn upload_files<O: FileOwner>(
        &self,
        owner: &O,
        files: &[UploadedFile],
    ) -> StorageResult<()> {
        for file in files {
            self.upload_file(owner, file).await?;
        }
        Ok(())
    }

    pub async fn delete_file<'a, O: FileOwner>(
        &self,
        owner: &O,
        file: impl Into<StoredFile<'a>>,
    ) -> StorageResult<()> {
        let file = file.into();
        let directory = owner.upload_dir();
        self.store.delete(&directory, &file.name()).await
    }

    /// Delete every file, attempting all of them even if some fail. Returns
    /// the first error encountered.
    pub async fn delete_files<'a, O, I>(&self, owner: &O, files: I) -> StorageResult<()>
    where
        O: FileOwner,
        I: IntoIterator,
        I::Item: Into<StoredFile<'a>>,
    {
        let mut first_error: Option<StorageError> = None;
        for file in files {
            let file = file.into();
            if let Err(e) = self.delete_file(owner, file).await {
                tracing::warn!(name = %file.name(), error = %e, "Failed to delete file");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn exists<O: FileOwner>(&self, owner: &O, name: &str) -> StorageResult<bool> {
        self.store.exists(&owner.upload_dir(), name).await
    }

    /// Public URL of a stored file, when a base URL is configured.
    pub fn file_url<O: FileOwner>(&self, owner: &O, name: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{base}/{}", relative_file_path(owner, name)))
    }
}
