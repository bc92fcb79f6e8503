use crate::AppState;
use crate::api::error::AppError;
use crate::models::{CreateVideoRequest, Video};
use crate::services::ingest_service::ensure_owner;
use crate::services::video_store::NewVideo;
use crate::utils::auth::Claims;
use crate::utils::validation::AssetClass;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    post,
    path = "/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Video created", body = Video),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn create_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let video = state
        .videos
        .create(NewVideo {
            title: req.title,
            description: req.description,
            user_id: claims.sub,
        })
        .await?;

    tracing::info!(video_id = %video.id, owner = %video.user_id, "Video created");
    Ok((StatusCode::CREATED, Json(Video::from(video))))
}

#[utoipa::path(
    get,
    path = "/videos",
    responses(
        (status = 200, description = "Videos owned by the caller, newest first", body = [Video]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Video>>, AppError> {
    let videos = state.videos.list_for_owner(&claims.sub).await?;
    Ok(Json(videos.into_iter().map(Video::from).collect()))
}

#[utoipa::path(
    get,
    path = "/videos/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video found", body = Video),
        (status = 400, description = "Invalid ID"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Video>, AppError> {
    let id = parse_video_id(&id)?;
    let video = state.videos.get(&id).await?;
    Ok(Json(video.into()))
}

#[utoipa::path(
    delete,
    path = "/videos/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn delete_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_video_id(&id)?;
    let video = state.videos.get(&id).await?;
    ensure_owner(&video, &claims.sub)?;

    state.videos.delete(&id).await?;
    tracing::info!(video_id = %id, "Video deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/videos/{id}/thumbnail",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body(content = ThumbnailUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Thumbnail attached", body = Video),
        (status = 400, description = "Invalid ID, missing field or unsupported type"),
        (status = 401, description = "Unauthorized or not the owner"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Thumbnail too large")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    upload_asset(state, claims, id, multipart, AssetClass::Thumbnail).await
}

#[utoipa::path(
    post,
    path = "/videos/{id}/video",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body(content = VideoUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video file attached", body = Video),
        (status = 400, description = "Invalid ID, missing field, unsupported type or no thumbnail yet"),
        (status = 401, description = "Unauthorized or not the owner"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Video too large")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    upload_asset(state, claims, id, multipart, AssetClass::Video).await
}

async fn upload_asset(
    state: AppState,
    claims: Claims,
    id: String,
    mut multipart: Multipart,
    class: AssetClass,
) -> Result<Json<Video>, AppError> {
    let id = parse_video_id(&id)?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        let err_msg = e.to_string();
        if err_msg.contains("length limit exceeded") {
            AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
        } else {
            AppError::BadRequest(err_msg)
        }
    })? {
        if field.name() != Some(class.field_name()) {
            continue;
        }

        let content_type = field.content_type().map(|s| s.to_string());
        let body_with_io_error = field.map_err(std::io::Error::other);
        let reader = StreamReader::new(body_with_io_error);

        let video = state
            .ingest
            .ingest(class, &id, &claims.sub, content_type.as_deref(), reader)
            .await?;
        return Ok(Json(video.into()));
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{}'",
        class.field_name()
    )))
}

fn parse_video_id(raw: &str) -> Result<String, AppError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| AppError::BadRequest("Invalid ID".to_string()))
}
