//! Storage ports used by the publication and ingest services

use crate::core::error::StorageError;
use crate::core::traits::{NewVideo, VideoQuery, VideoRecord};
use crate::orchestration::report::PublicationRecord;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Object storage holding the uploaded video files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Time-limited URL that platforms can fetch the object from
    async fn generate_fetch_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    /// Store `body` under `key`, replacing any existing object
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;
}

/// Relational store for videos and their publication audit trail
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn find_video(&self, id: i64) -> Result<Option<VideoRecord>, StorageError>;

    /// Videos matching the query, sorted descending by its order key
    async fn list_videos(&self, query: &VideoQuery) -> Result<Vec<VideoRecord>, StorageError>;

    /// Insert a video row and return the id the store assigned
    async fn insert_video(&self, video: &NewVideo) -> Result<i64, StorageError>;

    /// Append one audit record; existing records are never updated
    async fn append_publication(&self, record: &PublicationRecord) -> Result<(), StorageError>;

    /// Audit records of a video, most recent first
    async fn publications_for(&self, video_id: i64) -> Result<Vec<PublicationRecord>, StorageError>;
}
