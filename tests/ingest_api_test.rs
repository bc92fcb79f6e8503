use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tower::ServiceExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tubely::config::AppConfig;
use tubely::infrastructure::database;
use tubely::services::ingest_service::IngestService;
use tubely::services::staging::StagedUpload;
use tubely::services::storage::{LocalAssetStore, ObjectStore, object_url};
use tubely::services::video_store::SeaOrmVideoStore;
use tubely::utils::auth::create_jwt;
use tubely::utils::naming::StorageKey;
use tubely::{AppState, create_app};

const BOUNDARY: &str = "---------------------------tubelyboundary";
const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

struct MockVideoStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

#[async_trait]
impl ObjectStore for MockVideoStore {
    async fn put_object(
        &self,
        key: &StorageKey,
        content_type: &str,
        staged: &mut StagedUpload,
    ) -> anyhow::Result<String> {
        let mut data = Vec::new();
        staged.file_mut().read_to_end(&mut data).await?;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (content_type.to_string(), data));
        Ok(object_url("mock-bucket", "us-east-1", None, key.as_str()))
    }
}

struct TestApp {
    app: Router,
    config: AppConfig,
    media: Arc<MockVideoStore>,
    assets: tempfile::TempDir,
    staging: tempfile::TempDir,
}

impl TestApp {
    fn token(&self, user_id: &str) -> String {
        create_jwt(user_id, &self.config.jwt_secret, chrono::Duration::hours(1)).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn create_video(&self, user_id: &str) -> Value {
        let (status, json) = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/videos")
                    .header("Authorization", format!("Bearer {}", self.token(user_id)))
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        r#"{"title": "Boot.dev beats", "description": "lofi"}"#,
                    ))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json
    }

    async fn get_video(&self, user_id: &str, id: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .uri(format!("/videos/{}", id))
                .header("Authorization", format!("Bearer {}", self.token(user_id)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn upload(
        &self,
        user_id: Option<&str>,
        id: &str,
        field: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/videos/{}/{}", id, field))
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(user_id) = user_id {
            builder = builder.header("Authorization", format!("Bearer {}", self.token(user_id)));
        }
        self.send(
            builder
                .body(Body::from(multipart_body(field, content_type, data)))
                .unwrap(),
        )
        .await
    }
}

fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\n\
        Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn png_bytes(size: usize) -> Vec<u8> {
    let mut data = PNG_HEADER.to_vec();
    data.resize(size, 0xAB);
    data
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

async fn setup() -> TestApp {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("tubely=debug,tower_http=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();

    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();

    let assets = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let config = AppConfig {
        jwt_secret: "integration-secret".to_string(),
        assets_root: assets.path().to_path_buf(),
        staging_dir: staging.path().to_path_buf(),
        max_thumbnail_size: 64 * 1024,
        max_video_size: 256 * 1024,
        ..AppConfig::default()
    };

    let thumbnails = Arc::new(
        LocalAssetStore::new(&config.assets_root, config.assets_public_prefix.clone())
            .await
            .unwrap(),
    );
    let media = Arc::new(MockVideoStore {
        objects: Mutex::new(HashMap::new()),
    });
    let videos = Arc::new(SeaOrmVideoStore::new(db.clone()));
    let ingest = Arc::new(IngestService::new(
        videos.clone(),
        thumbnails,
        media.clone(),
        config.clone(),
    ));

    let app = create_app(AppState {
        db,
        videos,
        ingest,
        config: config.clone(),
    });

    TestApp {
        app,
        config,
        media,
        assets,
        staging,
    }
}

#[tokio::test]
async fn test_thumbnail_upload_is_stored_and_served() {
    let t = setup().await;
    let video = t.create_video("alice").await;
    let id = video["id"].as_str().unwrap();
    let png = png_bytes(10 * 1024);

    let (status, json) = t
        .upload(Some("alice"), id, "thumbnail", "image/png", &png)
        .await;
    assert_eq!(status, StatusCode::OK);

    let thumbnail_url = json["thumbnail_url"].as_str().unwrap();
    assert!(thumbnail_url.starts_with("/assets/"));
    assert!(thumbnail_url.ends_with(".png"));
    assert!(json["video_url"].is_null());

    let key = thumbnail_url.trim_start_matches("/assets/");
    assert_eq!(key.len(), 43 + ".png".len());
    assert_eq!(std::fs::read(t.assets.path().join(key)).unwrap(), png);
    assert!(dir_is_empty(t.staging.path()));

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri(thumbnail_url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(served.as_ref(), png.as_slice());
}

#[tokio::test]
async fn test_video_upload_after_thumbnail() {
    let t = setup().await;
    let video = t.create_video("alice").await;
    let id = video["id"].as_str().unwrap();

    let (status, _) = t
        .upload(Some("alice"), id, "thumbnail", "image/jpeg", b"jpeg bytes")
        .await;
    assert_eq!(status, StatusCode::OK);

    let mp4 = vec![0x42u8; 100 * 1024];
    let (status, json) = t
        .upload(Some("alice"), id, "video", "video/mp4", &mp4)
        .await;
    assert_eq!(status, StatusCode::OK);

    let video_url = json["video_url"].as_str().unwrap();
    assert!(video_url.starts_with("https://mock-bucket.s3.us-east-1.amazonaws.com/"));
    assert!(video_url.ends_with(".mp4"));
    assert!(json["thumbnail_url"].as_str().unwrap().ends_with(".jpeg"));

    let objects = t.media.objects.lock().unwrap();
    assert_eq!(objects.len(), 1);
    let (content_type, data) = objects.values().next().unwrap();
    assert_eq!(content_type, "video/mp4");
    assert_eq!(data, &mp4);
    assert!(dir_is_empty(t.staging.path()));
}

#[tokio::test]
async fn test_unsupported_types_are_rejected() {
    let t = setup().await;
    let video = t.create_video("alice").await;
    let id = video["id"].as_str().unwrap();

    let (status, _) = t
        .upload(Some("alice"), id, "thumbnail", "image/gif", b"GIF89a")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    t.upload(Some("alice"), id, "thumbnail", "image/png", &png_bytes(512))
        .await;
    let (status, json) = t
        .upload(Some("alice"), id, "video", "text/plain", b"not a video")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());
    assert!(t.media.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_video_is_rejected_without_side_effects() {
    let t = setup().await;
    let video = t.create_video("alice").await;
    let id = video["id"].as_str().unwrap();
    t.upload(Some("alice"), id, "thumbnail", "image/png", &png_bytes(512))
        .await;
    let (_, before) = t.get_video("alice", id).await;

    let oversized = vec![0u8; t.config.max_video_size + 1];
    let (status, _) = t
        .upload(Some("alice"), id, "video", "video/mp4", &oversized)
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (_, after) = t.get_video("alice", id).await;
    assert_eq!(before, after);
    assert!(t.media.objects.lock().unwrap().is_empty());
    assert!(dir_is_empty(t.staging.path()));
}

#[tokio::test]
async fn test_non_owner_cannot_attach() {
    let t = setup().await;
    let video = t.create_video("alice").await;
    let id = video["id"].as_str().unwrap();

    let (status, json) = t
        .upload(Some("mallory"), id, "thumbnail", "image/png", &png_bytes(512))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Incorrect user");

    let (_, after) = t.get_video("alice", id).await;
    assert!(after["thumbnail_url"].is_null());
    assert!(dir_is_empty(t.assets.path()));
}

#[tokio::test]
async fn test_missing_token_and_bad_id() {
    let t = setup().await;
    let video = t.create_video("alice").await;
    let id = video["id"].as_str().unwrap();

    let (status, _) = t
        .upload(None, id, "thumbnail", "image/png", &png_bytes(512))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = t
        .upload(Some("alice"), "not-a-uuid", "thumbnail", "image/png", &png_bytes(512))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid ID");

    let (status, _) = t
        .upload(
            Some("alice"),
            &uuid::Uuid::new_v4().to_string(),
            "thumbnail",
            "image/png",
            &png_bytes(512),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_video_before_thumbnail_and_missing_field() {
    let t = setup().await;
    let video = t.create_video("alice").await;
    let id = video["id"].as_str().unwrap();

    let (status, _) = t
        .upload(Some("alice"), id, "video", "video/mp4", b"mp4")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The thumbnail endpoint only reads the "thumbnail" field.
    let (status, json) = t
        .send(
            Request::builder()
                .method("POST")
                .uri(format!("/videos/{}/thumbnail", id))
                .header("Authorization", format!("Bearer {}", t.token("alice")))
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body("image", "image/png", &png_bytes(512))))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing multipart field 'thumbnail'");
    assert!(t.media.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_video_crud() {
    let t = setup().await;
    let first = t.create_video("alice").await;
    let second = t.create_video("alice").await;
    t.create_video("bob").await;
    assert_eq!(first["user_id"], "alice");

    let (status, list) = t
        .send(
            Request::builder()
                .uri("/videos")
                .header("Authorization", format!("Bearer {}", t.token("alice")))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first["id"].as_str().unwrap()));
    assert!(ids.contains(&second["id"].as_str().unwrap()));

    let id = first["id"].as_str().unwrap();
    let delete = |user: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/videos/{}", id))
            .header("Authorization", format!("Bearer {}", t.token(user)))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = t.send(delete("bob")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.send(delete("alice")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t.get_video("alice", id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_video_validates_title() {
    let t = setup().await;
    let (status, _) = t
        .send(
            Request::builder()
                .method("POST")
                .uri("/videos")
                .header("Authorization", format!("Bearer {}", t.token("alice")))
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"title": "", "description": "x"}"#))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let t = setup().await;
    let (status, json) = t
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "connected");
}
