//! S3 object store: uploads and presigned fetch URLs

use crate::core::config::StorageConfig;
use crate::core::error::{ConfigError, StorageError};
use crate::storage::ports::ObjectStore;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

/// `ObjectStore` over one S3 bucket
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Build a client from the default AWS credential chain
    pub async fn from_config(config: &StorageConfig) -> Result<Self, ConfigError> {
        let bucket = config
            .bucket_name
            .clone()
            .filter(|bucket| !bucket.trim().is_empty())
            .ok_or(ConfigError::Missing("S3_BUCKET_NAME"))?;

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .load()
            .await;

        Ok(Self::new(Client::new(&aws_config), bucket))
    }

    /// Make sure the object exists and is readable before signing a URL for it
    async fn ensure_exists(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify_head_error(key, err))?;
        Ok(())
    }
}

fn classify_head_error(key: &str, err: SdkError<HeadObjectError, HttpResponse>) -> StorageError {
    if err.as_service_error().is_some_and(HeadObjectError::is_not_found) {
        return StorageError::ObjectNotFound {
            key: key.to_string(),
        };
    }

    match err.raw_response().map(|response| response.status().as_u16()) {
        Some(404) => StorageError::ObjectNotFound {
            key: key.to_string(),
        },
        Some(403) => StorageError::AccessDenied {
            key: key.to_string(),
        },
        _ => StorageError::Backend(err.to_string()),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn generate_fetch_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        self.ensure_exists(key).await?;

        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| StorageError::Backend(format!("invalid presigning config: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        debug!(bucket = %self.bucket, key, ttl_seconds = ttl.as_secs(), "generated presigned URL");
        Ok(request.uri().to_string())
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("upload of {} failed: {}", key, e)))?;

        debug!(bucket = %self.bucket, key, bytes = size, "uploaded object");
        Ok(())
    }
}
