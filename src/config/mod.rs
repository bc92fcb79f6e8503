use std::env;
use std::path::PathBuf;

/// Runtime configuration shared by every component of the ingestion pipeline.
///
/// Built once at startup and cloned into each service; nothing reads the
/// environment after that.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection string (default: "sqlite://tubely.db?mode=rwc")
    pub database_url: String,

    /// JWT Secret Key (default: "secret")
    pub jwt_secret: String,

    /// Directory thumbnails are written to (default: "./assets")
    pub assets_root: PathBuf,

    /// URL prefix the assets root is served under (default: "/assets")
    pub assets_public_prefix: String,

    /// Bucket receiving video uploads (default: "tubely-videos")
    pub s3_bucket: String,

    /// Region of the video bucket (default: "us-east-1")
    pub s3_region: String,

    /// Custom S3-compatible endpoint, e.g. MinIO. Unset means AWS.
    pub s3_endpoint: Option<String>,

    /// Static credentials for the object store. Unset means the default AWS chain.
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,

    /// Where upload bodies are staged (default: system temp dir)
    pub staging_dir: PathBuf,

    /// Maximum video body in bytes (default: 1 GiB)
    pub max_video_size: usize,

    /// Maximum thumbnail body in bytes (default: 10 MiB)
    pub max_thumbnail_size: usize,

    /// Age after which leftover staging files are swept (default: 24)
    pub staging_cleanup_age_hours: u64,

    /// Check staged bytes against the declared content type (default: false)
    pub verify_magic_bytes: bool,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tubely.db?mode=rwc".to_string(),
            jwt_secret: "secret".to_string(),
            assets_root: PathBuf::from("./assets"),
            assets_public_prefix: "/assets".to_string(),
            s3_bucket: "tubely-videos".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            staging_dir: env::temp_dir(),
            max_video_size: 1024 * 1024 * 1024,  // 1 GiB
            max_thumbnail_size: 10 * 1024 * 1024, // 10 MiB
            staging_cleanup_age_hours: 24,
            verify_magic_bytes: false,
            allowed_origins: vec![
                "http://localhost:8091".to_string(),
                "http://127.0.0.1:8091".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Missing or unparseable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(default.database_url),

            jwt_secret: lookup("JWT_SECRET").unwrap_or(default.jwt_secret),

            assets_root: lookup("ASSETS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.assets_root),

            assets_public_prefix: lookup("ASSETS_PUBLIC_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(default.assets_public_prefix),

            s3_bucket: lookup("S3_BUCKET").unwrap_or(default.s3_bucket),

            s3_region: lookup("S3_REGION").unwrap_or(default.s3_region),

            s3_endpoint: lookup("S3_ENDPOINT").filter(|v| !v.is_empty()),

            s3_access_key: lookup("S3_ACCESS_KEY").filter(|v| !v.is_empty()),

            s3_secret_key: lookup("S3_SECRET_KEY").filter(|v| !v.is_empty()),

            staging_dir: lookup("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            max_video_size: lookup("MAX_VIDEO_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_video_size),

            max_thumbnail_size: lookup("MAX_THUMBNAIL_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_thumbnail_size),

            staging_cleanup_age_hours: lookup("STAGING_CLEANUP_AGE_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.staging_cleanup_age_hours),

            verify_magic_bytes: lookup("VERIFY_MAGIC_BYTES")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.verify_magic_bytes),

            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    format!("/{}", prefix.trim_matches('/'))
}
