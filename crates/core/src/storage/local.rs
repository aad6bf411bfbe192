use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{validate_segment, FileStore, StorageError, StorageResult};

/// Local filesystem store rooted at a base directory.
///
/// `put("3f1c...", "ab12.mp4")` writes `{base_path}/3f1c.../ab12.mp4`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    base_path: PathBuf,
}

impl LocalFileStore {
    /// Create the store, making sure the base directory exists.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, directory: &str, name: &str) -> StorageResult<PathBuf> {
        validate_segment(directory)?;
        validate_segment(name)?;
        if name.contains('/') {
            return Err(StorageError::InvalidKey(format!(
                "file name '{name}' must not contain a path separator"
            )));
        }
        Ok(self.base_path.join(directory).join(name))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, directory: &str, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.full_path(directory, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {e}", path.display()))
        })?;
        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {e}", path.display()))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {e}", path.display()))
        })?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stored file"
        );
        Ok(())
    }

    async fn delete(&self, directory: &str, name: &str) -> StorageResult<()> {
        let path = self.full_path(directory, name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {e}",
                path.display()
            ))),
        }
    }

    async fn exists(&self, directory: &str, name: &str) -> StorageResult<bool> {
        let path = self.full_path(directory, name)?;
        Ok(fs::try_exists(&path).await?)
    }
}
