//! In-memory storage adapters for tests and dry runs

use crate::core::error::StorageError;
use crate::core::traits::{NewVideo, VideoOrder, VideoQuery, VideoRecord};
use crate::orchestration::report::PublicationRecord;
use crate::storage::ports::{ObjectStore, VideoRepository};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Video repository backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryVideoRepository {
    videos: Mutex<HashMap<i64, VideoRecord>>,
    publications: Mutex<Vec<PublicationRecord>>,
    fail_appends: AtomicBool,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_videos(videos: impl IntoIterator<Item = VideoRecord>) -> Self {
        let repository = Self::new();
        for video in videos {
            repository.add_video(video);
        }
        repository
    }

    /// Store a complete record as is, keeping its id
    pub fn add_video(&self, video: VideoRecord) {
        lock(&self.videos).insert(video.id, video);
    }

    /// Make every following `append_publication` fail
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Every stored audit record in insertion order
    pub fn all_publications(&self) -> Vec<PublicationRecord> {
        lock(&self.publications).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn find_video(&self, id: i64) -> Result<Option<VideoRecord>, StorageError> {
        Ok(lock(&self.videos).get(&id).cloned())
    }

    async fn list_videos(&self, query: &VideoQuery) -> Result<Vec<VideoRecord>, StorageError> {
        let mut videos: Vec<VideoRecord> = lock(&self.videos)
            .values()
            .filter(|video| query.matches(video))
            .cloned()
            .collect();

        match query.order_by {
            VideoOrder::UploadDate => {
                videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            VideoOrder::Title => videos.sort_by(|a, b| b.title.cmp(&a.title).then(b.id.cmp(&a.id))),
        }
        Ok(videos)
    }

    async fn insert_video(&self, video: &NewVideo) -> Result<i64, StorageError> {
        let mut videos = lock(&self.videos);
        let id = videos.keys().max().map_or(1, |max| max + 1);

        videos.insert(
            id,
            VideoRecord {
                id,
                filename: video.filename.clone(),
                s3_key: video.s3_key.clone(),
                title: video.title.clone(),
                description: video.description.clone(),
                tags: video.tags.clone(),
                file_size: video.file_size,
                duration: video.duration,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn append_publication(&self, record: &PublicationRecord) -> Result<(), StorageError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StorageError::Query("video_publications is read-only".to_string()));
        }
        lock(&self.publications).push(record.clone());
        Ok(())
    }

    async fn publications_for(&self, video_id: i64) -> Result<Vec<PublicationRecord>, StorageError> {
        // Reverse first so that equal timestamps keep the latest append on top
        let mut records: Vec<PublicationRecord> = lock(&self.publications)
            .iter()
            .rev()
            .filter(|record| record.video_id == video_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

/// An object held by `InMemoryObjectStore`
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Object store that hands out predictable URLs for known keys
#[derive(Debug)]
pub struct InMemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_keys<I, K>(base_url: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let store = Self::new(base_url);
        for key in keys {
            store.insert_key(key);
        }
        store
    }

    /// Register an empty object under `key`
    pub fn insert_key(&self, key: impl Into<String>) {
        lock(&self.objects).insert(
            key.into(),
            StoredObject {
                body: Bytes::new(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        lock(&self.objects).get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn generate_fetch_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        if !lock(&self.objects).contains_key(key) {
            return Err(StorageError::ObjectNotFound {
                key: key.to_string(),
            });
        }
        Ok(format!(
            "{}/{}?expires_in={}",
            self.base_url,
            key,
            ttl.as_secs()
        ))
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        lock(&self.objects).insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
