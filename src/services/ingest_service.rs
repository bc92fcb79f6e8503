use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::entities::videos;
use crate::services::staging::{StagingError, StagingWriter};
use crate::services::storage::ObjectStore;
use crate::services::video_store::VideoStore;
use crate::utils::keyed_mutex::KeyedMutex;
use crate::utils::naming::StorageKey;
use crate::utils::validation::{AssetClass, validate_content_type, verify_magic_bytes};
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Leading bytes inspected when magic-byte verification is enabled.
const MAGIC_HEADER_LEN: usize = 512;

/// Turns an upload body into stored bytes plus an updated video record.
///
/// Stages run strictly in order: validate, name, stage, store, reconcile.
/// Any failure aborts the rest. The staged temp file is gone by the time
/// `ingest` returns, on every path.
pub struct IngestService {
    videos: Arc<dyn VideoStore>,
    thumbnails: Arc<dyn ObjectStore>,
    media: Arc<dyn ObjectStore>,
    staging: StagingWriter,
    locks: KeyedMutex,
    config: AppConfig,
}

impl IngestService {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        thumbnails: Arc<dyn ObjectStore>,
        media: Arc<dyn ObjectStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            videos,
            thumbnails,
            media,
            staging: StagingWriter::new(config.staging_dir.clone()),
            locks: KeyedMutex::new(),
            config,
        }
    }

    pub fn locks(&self) -> &KeyedMutex {
        &self.locks
    }

    pub fn max_size(&self, class: AssetClass) -> usize {
        match class {
            AssetClass::Video => self.config.max_video_size,
            AssetClass::Thumbnail => self.config.max_thumbnail_size,
        }
    }

    fn store_for(&self, class: AssetClass) -> &dyn ObjectStore {
        match class {
            AssetClass::Video => self.media.as_ref(),
            AssetClass::Thumbnail => self.thumbnails.as_ref(),
        }
    }

    pub async fn ingest<'a>(
        &self,
        class: AssetClass,
        video_id: &str,
        actor_id: &str,
        content_type: Option<&str>,
        reader: impl AsyncRead + Unpin + Send + 'a,
    ) -> Result<videos::Model, AppError> {
        tracing::info!(
            video_id = %video_id,
            actor = %actor_id,
            "Uploading {} for video",
            class
        );

        // Checked before the body is read so a rejected request costs nothing.
        let video = self.videos.get(video_id).await?;
        ensure_owner(&video, actor_id)?;
        if class == AssetClass::Video && video.thumbnail_url.is_none() {
            return Err(AppError::BadRequest(
                "Upload a thumbnail before attaching a video".to_string(),
            ));
        }

        let validated = validate_content_type(content_type, class)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let key = StorageKey::generate(&validated).map_err(|e| {
            AppError::Internal(format!("Could not generate storage key: {}", e))
        })?;

        let mut staged = self
            .staging
            .stage(reader, self.max_size(class) as u64)
            .await
            .map_err(|e| staging_error(class, e))?;

        if staged.is_empty() {
            return Err(AppError::BadRequest(format!("Uploaded {} is empty", class)));
        }

        if self.config.verify_magic_bytes {
            let header = staged
                .read_header(MAGIC_HEADER_LEN)
                .await
                .map_err(|e| AppError::Internal(format!("Could not read staged file: {}", e)))?;
            verify_magic_bytes(&header, &validated)
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
        }

        tracing::info!(
            video_id = %video_id,
            key = %key,
            size_bytes = staged.len(),
            "Staged {}, storing",
            class
        );

        let location = self
            .store_for(class)
            .put_object(&key, validated.as_str(), &mut staged)
            .await
            .map_err(|e| AppError::Internal(format!("Could not store {}: {:#}", class, e)))?;

        drop(staged);

        match self.reconcile(class, video_id, actor_id, &location).await {
            Ok(updated) => {
                tracing::info!(video_id = %video_id, location = %location, "Attached {}", class);
                Ok(updated)
            }
            Err(e) => {
                tracing::warn!(
                    video_id = %video_id,
                    key = %key,
                    location = %location,
                    "Stored {} is orphaned, metadata update failed",
                    class
                );
                Err(e)
            }
        }
    }

    /// Re-reads the record under its lock and sets only the field this
    /// upload owns, so concurrent attaches to one record don't clobber
    /// each other.
    async fn reconcile(
        &self,
        class: AssetClass,
        video_id: &str,
        actor_id: &str,
        location: &str,
    ) -> Result<videos::Model, AppError> {
        let _guard = self.locks.lock(video_id).await;

        let mut video = self.videos.get(video_id).await?;
        ensure_owner(&video, actor_id)?;

        match class {
            AssetClass::Thumbnail => video.thumbnail_url = Some(location.to_string()),
            AssetClass::Video => video.video_url = Some(location.to_string()),
        }

        Ok(self.videos.update(&video).await?)
    }
}

pub fn ensure_owner(video: &videos::Model, actor_id: &str) -> Result<(), AppError> {
    if video.user_id != actor_id {
        return Err(AppError::Unauthorized("Incorrect user".to_string()));
    }
    Ok(())
}

fn staging_error(class: AssetClass, err: StagingError) -> AppError {
    match err {
        StagingError::TooLarge { limit } => AppError::PayloadTooLarge(format!(
            "{} exceeds the maximum size of {} bytes",
            class, limit
        )),
        StagingError::Read(e) => {
            tracing::debug!("Upload body read failed: {}", e);
            AppError::BadRequest(format!("Could not read {} upload", class))
        }
        StagingError::Io(e) => AppError::Internal(format!("Could not stage {}: {}", class, e)),
    }
}
