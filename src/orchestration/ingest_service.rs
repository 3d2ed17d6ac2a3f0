//! Ingest Service - stores a new video file and its metadata
//!
//! The object is written first and the row second, so every stored row points
//! at an existing object. A failed insert leaves an orphaned object behind.

use crate::core::error::ServiceError;
use crate::core::traits::{NewVideo, file_extension};
use crate::storage::{ObjectStore, VideoRepository};
use crate::validation::VideoValidator;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// A video file with the metadata to store alongside it
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub body: Bytes,
    pub title: String,
    pub description: String,
    /// Comma separated, as typed by the user
    pub tags: String,
    pub duration: f64,
}

/// Where an uploaded video ended up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedVideo {
    pub video_id: i64,
    pub s3_key: String,
}

/// VideoIngestService - validation, object upload and row insert
pub struct VideoIngestService {
    repository: Arc<dyn VideoRepository>,
    object_store: Arc<dyn ObjectStore>,
    validator: VideoValidator,
}

impl VideoIngestService {
    pub fn new(
        repository: Arc<dyn VideoRepository>,
        object_store: Arc<dyn ObjectStore>,
        validator: VideoValidator,
    ) -> Self {
        Self {
            repository,
            object_store,
            validator,
        }
    }

    /// Upload the file and record it, returning the new video id
    pub async fn upload_video(&self, request: UploadRequest) -> Result<UploadedVideo, ServiceError> {
        let file_size = i64::try_from(request.body.len()).unwrap_or(i64::MAX);
        self.validator
            .validate_upload(&request.filename, &request.title, file_size)?;

        let s3_key = object_key(Utc::now(), &request.filename);
        let content_type = content_type(&request.filename);

        self.object_store
            .put_object(&s3_key, request.body, content_type)
            .await?;

        let video = NewVideo {
            filename: request.filename,
            s3_key: s3_key.clone(),
            title: request.title.trim().to_string(),
            description: request.description,
            tags: parse_tags(&request.tags),
            file_size,
            duration: request.duration,
        };

        let video_id = match self.repository.insert_video(&video).await {
            Ok(id) => id,
            Err(err) => {
                warn!(s3_key = %s3_key, code = err.code(), "uploaded object has no video row: {}", err);
                return Err(err.into());
            }
        };

        info!(video_id, s3_key = %s3_key, bytes = file_size, "video uploaded");
        Ok(UploadedVideo { video_id, s3_key })
    }
}

/// `YYYYmmddHHMMSS_<file name>`, keeping only the last path segment
fn object_key(now: DateTime<Utc>, filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    format!("{}_{}", now.format("%Y%m%d%H%M%S"), name)
}

fn content_type(filename: &str) -> &'static str {
    match file_extension(filename).as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Split on commas, trimming and dropping blanks and repeats
fn parse_tags(tags: &str) -> Vec<String> {
    let mut parsed: Vec<String> = Vec::new();
    for tag in tags.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
        if !parsed.iter().any(|seen| seen == tag) {
            parsed.push(tag.to_string());
        }
    }
    parsed
}
