use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{ImageUpload, StoredImage};

pub const IMAGE_PREFIX: &str = "chat-images";
pub const PRESIGN_EXPIRY_SECS: u64 = 15 * 60;

/// `chat-images/{uuid}{ext}`, keeping the uploaded file's extension.
pub fn object_key(filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!("{}/{}{}", IMAGE_PREFIX, Uuid::new_v4(), ext)
}

/// Chat image storage on S3, or on an S3-compatible endpoint when
/// `S3_ENDPOINT` is set (addressed path-style).
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        if !config.is_storage_configured() {
            return Err(anyhow!("S3 storage is not configured"));
        }

        let credentials = Credentials::new(
            config.aws_access_key.clone(),
            config.aws_secret_key.clone(),
            None,
            None,
            "app-config",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.s3_endpoint {
            loader = loader.endpoint_url(endpoint.trim_end_matches('/'));
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.s3_endpoint.is_some())
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.s3_bucket.clone(),
        })
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket, key)
    }

    pub async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        debug!("Uploading {} ({} bytes)", key, data.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                error!("S3 upload of {} failed: {}", key, DisplayErrorContext(&e));
                anyhow!("S3 upload failed: {}", DisplayErrorContext(&e))
            })?;

        Ok(())
    }

    /// Query-string signed GET URL valid for `expires_secs`.
    pub async fn presign_get(&self, key: &str, expires_secs: u64) -> Result<String> {
        self.presign_with(key, PresigningConfig::expires_in(Duration::from_secs(expires_secs))?)
            .await
    }

    async fn presign_with(&self, key: &str, presigning: PresigningConfig) -> Result<String> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| anyhow!("S3 presign failed: {}", DisplayErrorContext(&e)))?;

        Ok(request.uri().to_string())
    }

    /// Stores a chat image and returns its public and presigned URLs.
    pub async fn upload_image(&self, upload: ImageUpload) -> Result<StoredImage> {
        let key = object_key(&upload.filename);

        self.put_object(&key, upload.data, &upload.content_type).await?;
        let preview_url = self.presign_get(&key, PRESIGN_EXPIRY_SECS).await?;

        info!("Stored chat image {}", key);
        Ok(StoredImage {
            url: self.public_url(&key),
            key,
            preview_url,
        })
    }
}
