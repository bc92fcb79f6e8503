use crate::entities::{prelude::*, videos};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, Unchanged,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("video {0} not found")]
    NotFound(String),

    #[error("thumbnail URL is required")]
    ThumbnailRequired,

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub user_id: String,
}

/// Persistence boundary for asset records.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create(&self, video: NewVideo) -> Result<videos::Model, StoreError>;
    async fn get(&self, id: &str) -> Result<videos::Model, StoreError>;
    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<videos::Model>, StoreError>;
    /// Writes every mutable field of `video` in one statement.
    ///
    /// Records without a thumbnail URL are rejected before anything reaches
    /// the database. The owner and creation time are never rewritten.
    async fn update(&self, video: &videos::Model) -> Result<videos::Model, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

pub struct SeaOrmVideoStore {
    db: DatabaseConnection,
}

impl SeaOrmVideoStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoStore for SeaOrmVideoStore {
    async fn create(&self, video: NewVideo) -> Result<videos::Model, StoreError> {
        let now = Utc::now();
        let model = videos::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            title: Set(video.title),
            description: Set(video.description),
            thumbnail_url: Set(None),
            video_url: Set(None),
            user_id: Set(video.user_id),
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn get(&self, id: &str) -> Result<videos::Model, StoreError> {
        Videos::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<videos::Model>, StoreError> {
        Ok(Videos::find()
            .filter(videos::Column::UserId.eq(user_id))
            .order_by_desc(videos::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    async fn update(&self, video: &videos::Model) -> Result<videos::Model, StoreError> {
        let thumbnail_url = video
            .thumbnail_url
            .clone()
            .ok_or(StoreError::ThumbnailRequired)?;

        let active = videos::ActiveModel {
            id: Unchanged(video.id.clone()),
            updated_at: Set(Utc::now()),
            title: Set(video.title.clone()),
            description: Set(video.description.clone()),
            thumbnail_url: Set(Some(thumbnail_url)),
            video_url: Set(video.video_url.clone()),
            ..Default::default()
        };

        match active.update(&self.db).await {
            Ok(updated) => Ok(updated),
            Err(DbErr::RecordNotUpdated) => Err(StoreError::NotFound(video.id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let res = Videos::delete_by_id(id.to_string()).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
