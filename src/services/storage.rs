use crate::services::staging::StagedUpload;
use crate::utils::naming::StorageKey;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Durable home for staged uploads.
///
/// Implementations make exactly one attempt; a failed call leaves no object
/// that callers may reference.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the staged bytes under `key` and returns the public location.
    async fn put_object(
        &self,
        key: &StorageKey,
        content_type: &str,
        staged: &mut StagedUpload,
    ) -> Result<String>;
}

/// Thumbnails: a directory served publicly under a URL prefix.
pub struct LocalAssetStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalAssetStore {
    pub async fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            anyhow!(
                "Failed to create assets directory {}: {}",
                root.display(),
                e
            )
        })?;

        Ok(Self {
            root,
            public_prefix: public_prefix.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_prefix.trim_end_matches('/'), key)
    }

    /// Keys are flat file names; anything that could leave the root is refused.
    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.starts_with('.')
        {
            return Err(anyhow!("Invalid storage key '{}'", key));
        }
        Ok(self.root.join(key))
    }

    /// Copies the staged bytes into a new file at `path`. A file this call
    /// created is removed again if the copy fails.
    async fn write_file(path: &Path, staged: &mut StagedUpload) -> Result<u64> {
        staged.rewind().await?;
        let mut dest = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let copied = async {
            let written = tokio::io::copy(staged.file_mut(), &mut dest).await?;
            dest.flush().await?;
            dest.sync_all().await?;
            Ok::<_, std::io::Error>(written)
        }
        .await;

        if copied.is_err() {
            let _ = fs::remove_file(path).await;
        }
        Ok(copied?)
    }
}

#[async_trait]
impl ObjectStore for LocalAssetStore {
    async fn put_object(
        &self,
        key: &StorageKey,
        _content_type: &str,
        staged: &mut StagedUpload,
    ) -> Result<String> {
        let path = self.key_to_path(key.as_str())?;
        let start = std::time::Instant::now();

        match Self::write_file(&path, staged).await {
            Ok(written) => {
                tracing::info!(
                    path = %path.display(),
                    key = %key,
                    size_bytes = written,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local asset write successful"
                );
                Ok(self.public_url(key.as_str()))
            }
            Err(e) => Err(anyhow!("Failed to write asset {}: {}", path.display(), e)),
        }
    }
}

/// Videos: one bucket in S3 or an S3-compatible service.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String, region: String, endpoint: Option<String>) -> Self {
        Self {
            client,
            bucket,
            region,
            endpoint,
        }
    }

    /// Externally resolvable URL of `key`. Custom endpoints are addressed
    /// path-style, AWS virtual-hosted style.
    pub fn object_url(&self, key: &str) -> String {
        object_url(&self.bucket, &self.region, self.endpoint.as_deref(), key)
    }
}

pub fn object_url(bucket: &str, region: &str, endpoint: Option<&str>, key: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &StorageKey,
        content_type: &str,
        staged: &mut StagedUpload,
    ) -> Result<String> {
        staged.rewind().await?;
        let file = staged.file_mut().try_clone().await?;
        let body = ByteStream::read_from().file(file).build().await?;
        let start = std::time::Instant::now();

        let res = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(content_type)
            .content_length(staged.len() as i64)
            .body(body)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 put_object failed: bucket={}, key={}, error={:?}",
                self.bucket,
                key,
                e
            );
            return Err(e.into());
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = staged.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.object_url(key.as_str()))
    }
}
