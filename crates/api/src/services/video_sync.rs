//! Video transaction coordinator.
//!
//! Creates and updates videos as one unit of work:
//!
//! ```text
//! Validating -> Persisting -> RelationSyncing -> FileSyncing -> Committing
//!                                                                  |
//!                                            Committed <-----------+
//! any failure after BEGIN -> RolledBack (transaction rolled back,
//!                                        uploaded files removed)
//! ```
//!
//! Validation (including the relation lookups) happens before `BEGIN`.
//! File writes happen inside the transaction window but outside the
//! database; a rollback compensates by deleting them. Superseded files are
//! only removed after a successful commit.

use std::fmt;

use catalog_core::attributes::Attributes;
use catalog_core::types::DbId;
use catalog_core::uploads::{extract_files, FileOwner, UploadManager, UploadedFile};
use catalog_core::validation::video::{validate_video, VideoInput};
use catalog_db::lookup::PgRelationLookup;
use catalog_db::models::video::{Video, VideoFiles};
use catalog_db::repositories::VideoRepo;
use catalog_db::DbPool;
use sqlx::{Postgres, Transaction};

use crate::error::{AppError, AppResult};

/// Where a create/update currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Validating,
    Persisting,
    RelationSyncing,
    FileSyncing,
    Committing,
    Committed,
    RolledBack,
}

impl SyncStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Persisting => "persisting",
            Self::RelationSyncing => "relation_syncing",
            Self::FileSyncing => "file_syncing",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records and logs stage transitions for one operation.
#[derive(Debug)]
struct StageTracker {
    operation: &'static str,
    stage: SyncStage,
    video_id: Option<DbId>,
}

impl StageTracker {
    fn start(operation: &'static str, video_id: Option<DbId>) -> Self {
        tracing::debug!(operation, video_id = ?video_id, stage = %SyncStage::Validating, "Video sync started");
        Self {
            operation,
            stage: SyncStage::Validating,
            video_id,
        }
    }

    fn advance(&mut self, next: SyncStage) {
        tracing::debug!(
            operation = self.operation,
            video_id = ?self.video_id,
            from = %self.stage,
            to = %next,
            "Video sync stage"
        );
        self.stage = next;
    }
}

/// Coordinates validation, persistence, relation sync and file upload for
/// video create/update.
pub struct VideoSync<'a> {
    pool: &'a DbPool,
    uploads: &'a UploadManager,
}

impl<'a> VideoSync<'a> {
    pub fn new(pool: &'a DbPool, uploads: &'a UploadManager) -> Self {
        Self { pool, uploads }
    }

    /// Validate `attributes` and create a video from them.
    pub async fn store(&self, attributes: Attributes) -> AppResult<Video> {
        let mut stages = StageTracker::start("store", None);
        let input = self.validate(&attributes).await?;
        self.store_inner(&mut stages, input, attributes).await
    }

    /// Create a video from input that already passed validation.
    ///
    /// `attributes` still supplies the file fields.
    pub async fn store_validated(
        &self,
        input: VideoInput,
        attributes: Attributes,
    ) -> AppResult<Video> {
        let mut stages = StageTracker::start("store", None);
        self.store_inner(&mut stages, input, attributes).await
    }

    /// Validate `attributes` and apply them to `existing`.
    ///
    /// Relations are fully replaced. For each file field that was
    /// resubmitted, the previous file is removed after commit when its name
    /// changed. Fields not resubmitted keep their file.
    pub async fn update(&self, existing: &Video, attributes: Attributes) -> AppResult<Video> {
        let mut stages = StageTracker::start("update", Some(existing.id));
        let input = self.validate(&attributes).await?;
        self.update_inner(&mut stages, existing, input, attributes)
            .await
    }

    async fn validate(&self, attributes: &Attributes) -> AppResult<VideoInput> {
        let lookup = PgRelationLookup::new(self.pool.clone());
        Ok(validate_video(attributes, &lookup).await?)
    }

    async fn store_inner(
        &self,
        stages: &mut StageTracker,
        input: VideoInput,
        mut attributes: Attributes,
    ) -> AppResult<Video> {
        let files = extract_files::<Video>(&mut attributes);
        let names = VideoFiles::from_attributes(&attributes);

        let mut tx = self.pool.begin().await?;

        stages.advance(SyncStage::Persisting);
        let video = match VideoRepo::create_in_tx(&mut tx, &input, &names).await {
            Ok(video) => video,
            Err(e) => return Err(self.roll_back(stages, tx, None, &[], e.into()).await),
        };
        stages.video_id = Some(video.id);

        self.finish(stages, tx, &video, &input, &files, &[]).await?;
        tracing::info!(video_id = %video.id, files = files.len(), "Video created");
        Ok(video)
    }

    async fn update_inner(
        &self,
        stages: &mut StageTracker,
        existing: &Video,
        input: VideoInput,
        mut attributes: Attributes,
    ) -> AppResult<Video> {
        let files = extract_files::<Video>(&mut attributes);
        let names = VideoFiles::from_attributes(&attributes);

        // Names the row points at before this update. An upload that hashes
        // to one of them must survive a rollback.
        let kept: Vec<&str> = Video::FILE_FIELDS
            .iter()
            .filter_map(|field| existing.file_name(field))
            .collect();

        let mut tx = self.pool.begin().await?;

        stages.advance(SyncStage::Persisting);
        let video = match VideoRepo::update_in_tx(&mut tx, existing.id, &input, &names).await {
            Ok(Some(video)) => video,
            Ok(None) => {
                let err = AppError::Core(catalog_core::error::CoreError::NotFound {
                    entity: "Video",
                    id: existing.id,
                });
                return Err(self.roll_back(stages, tx, None, &[], err).await);
            }
            Err(e) => return Err(self.roll_back(stages, tx, None, &[], e.into()).await),
        };

        self.finish(stages, tx, &video, &input, &files, &kept).await?;
        self.delete_superseded(existing, &video).await;
        tracing::info!(video_id = %video.id, files = files.len(), "Video updated");
        Ok(video)
    }

    /// Relation sync, file upload and commit, shared by store and update.
    async fn finish(
        &self,
        stages: &mut StageTracker,
        mut tx: Transaction<'_, Postgres>,
        video: &Video,
        input: &VideoInput,
        files: &[UploadedFile],
        kept: &[&str],
    ) -> AppResult<()> {
        stages.advance(SyncStage::RelationSyncing);
        if let Err(e) = sync_relations(&mut tx, video.id, input).await {
            return Err(self.roll_back(stages, tx, None, &[], e.into()).await);
        }

        stages.advance(SyncStage::FileSyncing);
        let cleanup: Vec<&UploadedFile> = files
            .iter()
            .filter(|file| !kept.contains(&file.hash_name().as_str()))
            .collect();
        if let Err(e) = self.uploads.upload_files(video, files).await {
            return Err(self
                .roll_back(stages, tx, Some(video), &cleanup, e.into())
                .await);
        }

        stages.advance(SyncStage::Committing);
        if let Err(e) = tx.commit().await {
            self.remove_uploads(video, &cleanup).await;
            stages.advance(SyncStage::RolledBack);
            tracing::warn!(video_id = %video.id, error = %e, "Video sync commit failed");
            return Err(e.into());
        }

        stages.advance(SyncStage::Committed);
        Ok(())
    }

    /// Roll back `tx`, remove any files uploaded for `owner`, and hand back
    /// the error that caused it.
    async fn roll_back(
        &self,
        stages: &mut StageTracker,
        tx: Transaction<'_, Postgres>,
        owner: Option<&Video>,
        uploaded: &[&UploadedFile],
        cause: AppError,
    ) -> AppError {
        if let Err(e) = tx.rollback().await {
            tracing::error!(error = %e, "Failed to roll back video transaction");
        }
        if let Some(owner) = owner {
            self.remove_uploads(owner, uploaded).await;
        }
        stages.advance(SyncStage::RolledBack);
        tracing::warn!(
            operation = stages.operation,
            video_id = ?stages.video_id,
            error = %cause,
            "Video sync rolled back"
        );
        cause
    }

    async fn remove_uploads(&self, owner: &Video, uploaded: &[&UploadedFile]) {
        if uploaded.is_empty() {
            return;
        }
        if let Err(e) = self
            .uploads
            .delete_files(owner, uploaded.to_vec())
            .await
        {
            tracing::error!(video_id = %owner.id, error = %e, "Failed to remove uploaded files");
        }
    }

    /// After commit: delete each previous file whose field now names a
    /// different file and that no field of the updated row still uses.
    async fn delete_superseded(&self, before: &Video, after: &Video) {
        let still_used: Vec<&str> = Video::FILE_FIELDS
            .iter()
            .filter_map(|field| after.file_name(field))
            .collect();

        let superseded: Vec<&str> = Video::FILE_FIELDS
            .iter()
            .filter_map(|field| match (before.file_name(field), after.file_name(field)) {
                (Some(old), Some(new)) if old != new => Some(old),
                _ => None,
            })
            .filter(|old| !still_used.contains(old))
            .collect();

        if superseded.is_empty() {
            return;
        }
        if let Err(e) = self.uploads.delete_files(after, superseded).await {
            tracing::warn!(video_id = %after.id, error = %e, "Failed to delete superseded files");
        }
    }
}

async fn sync_relations(
    tx: &mut Transaction<'_, Postgres>,
    video_id: DbId,
    input: &VideoInput,
) -> Result<(), sqlx::Error> {
    VideoRepo::sync_categories_inner(tx, video_id, &input.categories_id).await?;
    VideoRepo::sync_genres_inner(tx, video_id, &input.genres_id).await?;
    Ok(())
}
