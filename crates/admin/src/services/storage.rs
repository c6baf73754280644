//! Product image storage on S3.
//!
//! The browser uploads straight to the bucket with a presigned `PUT` URL;
//! the back-office never proxies image bytes.

use std::time::Duration;

use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::presigning::{PresigningConfig, PresigningConfigError};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;

/// How long a presigned upload URL stays valid.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(5 * 60);

/// Key prefix for product images.
const PRODUCT_PREFIX: &str = "products";

/// Errors from the storage service.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid presigning config: {0}")]
    Config(#[from] PresigningConfigError),

    #[error("failed to presign upload: {0}")]
    Presign(#[from] SdkError<PutObjectError>),
}

/// Where the browser should `PUT` a file and where it will be served from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub public_url: String,
    pub key: String,
}

/// S3-backed image storage.
#[derive(Clone)]
pub struct StorageService {
    client: S3Client,
    config: StorageConfig,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Build a client for the configured bucket region.
    ///
    /// Credentials come from the default AWS provider chain.
    pub async fn new(config: StorageConfig) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        Self {
            client: S3Client::new(&aws_config),
            config,
        }
    }

    /// Presign a `PUT` for one product image.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the request cannot be signed.
    pub async fn presign_upload(
        &self,
        file_name: &str,
        content_type: &str,
    ) -> Result<PresignedUpload, StorageError> {
        let key = object_key(
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            file_name,
        );

        let presigned = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(UPLOAD_URL_TTL)?)
            .await?;

        tracing::debug!(key = %key, "Presigned image upload");
        Ok(PresignedUpload {
            upload_url: presigned.uri().to_string(),
            public_url: self.config.public_url(&key),
            key,
        })
    }
}

/// `products/{unix-millis}-{uuid}-{name}`.
fn object_key(unix_millis: i64, id: Uuid, file_name: &str) -> String {
    format!(
        "{PRODUCT_PREFIX}/{unix_millis}-{}-{}",
        id.simple(),
        sanitize_file_name(file_name)
    )
}

/// Keep ASCII letters, digits, `.` and `-`; everything else becomes `_`.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("famicom-01.JPG"), "famicom-01.JPG");
        assert_eq!(sanitize_file_name("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("ゲーム.png"), "___.png");
    }

    #[test]
    fn test_object_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            object_key(1_700_000_000_000, id, "box art.jpg"),
            "products/1700000000000-00000000000000000000000000000000-box_art.jpg"
        );
    }
}
