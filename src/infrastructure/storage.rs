use crate::config::AppConfig;
use crate::services::storage::{LocalAssetStore, S3ObjectStore};
use aws_sdk_s3::config::Region;
use aws_sdk_s3::config::retry::RetryConfig;
use std::sync::Arc;
use tracing::info;

pub async fn setup_asset_store(config: &AppConfig) -> anyhow::Result<Arc<LocalAssetStore>> {
    let store =
        LocalAssetStore::new(&config.assets_root, config.assets_public_prefix.clone()).await?;

    info!(
        "🖼️  Asset Storage: {} (served at {})",
        store.root().display(),
        config.assets_public_prefix
    );

    Ok(Arc::new(store))
}

pub async fn setup_video_store(config: &AppConfig) -> Arc<S3ObjectStore> {
    info!(
        "☁️  S3 Storage: {} (Bucket: {}, Region: {})",
        config.s3_endpoint.as_deref().unwrap_or("aws"),
        config.s3_bucket,
        config.s3_region
    );

    let mut loader = aws_config::from_env().region(Region::new(config.s3_region.clone()));

    if let Some(endpoint_url) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint_url);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.s3_access_key, &config.s3_secret_key) {
        loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    let aws_config = loader.load().await;

    // Uploads are attempted once; retrying is left to the client.
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.s3_endpoint.is_some())
        .retry_config(RetryConfig::disabled())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    match s3_client.head_bucket().bucket(&config.s3_bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", config.s3_bucket),
        Err(e) => tracing::warn!(
            "⚠️  Bucket '{}' is not reachable yet: {}",
            config.s3_bucket,
            e
        ),
    }

    Arc::new(S3ObjectStore::new(
        s3_client,
        config.s3_bucket.clone(),
        config.s3_region.clone(),
        config.s3_endpoint.clone(),
    ))
}
