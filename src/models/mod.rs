use crate::entities::videos;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Video record as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Video {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub user_id: String,
}

impl From<videos::Model> for Video {
    fn from(model: videos::Model) -> Self {
        Self {
            id: model.id,
            created_at: model.created_at,
            updated_at: model.updated_at,
            title: model.title,
            description: model.description,
            thumbnail_url: model.thumbnail_url,
            video_url: model.video_url,
            user_id: model.user_id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ThumbnailUpload {
    /// JPEG or PNG image
    #[schema(value_type = String, format = Binary)]
    pub thumbnail: Vec<u8>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct VideoUpload {
    /// MP4 video
    #[schema(value_type = String, format = Binary)]
    pub video: Vec<u8>,
}
