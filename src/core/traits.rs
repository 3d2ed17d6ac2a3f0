//! Core traits and types for video publication
//!
//! This module defines the video model handed to publishers, the fixed
//! per-platform requirements, and the `PlatformPublisher` abstraction that
//! every social-media integration implements.

use crate::core::error::{CredentialsError, PublicationError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ============================================================================
// Platforms
// ============================================================================

/// Supported social-media platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    TikTok,
    X,
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::TikTok,
        Platform::X,
        Platform::Facebook,
    ];

    /// Identifier used in requests and audit records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::TikTok => "tiktok",
            Self::X => "x",
            Self::Facebook => "facebook",
        }
    }

    /// Human readable name used in messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::TikTok => "TikTok",
            Self::X => "X",
            Self::Facebook => "Facebook",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|platform| platform.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown platform: {}", s))
    }
}

// ============================================================================
// Video model
// ============================================================================

/// A stored video as read from the relational store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub filename: String,
    pub s3_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Size in bytes
    pub file_size: i64,
    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Lower-cased text after the last `.` of the filename, empty if none
    pub fn extension(&self) -> String {
        file_extension(&self.filename)
    }

    pub fn file_size_mb(&self) -> f64 {
        self.file_size as f64 / BYTES_PER_MB
    }
}

/// Lower-cased text after the last `.`, empty string if there is no dot
pub fn file_extension(filename: &str) -> String {
    let filename = filename.to_lowercase();
    match filename.rsplit_once('.') {
        Some((_, extension)) => extension.to_string(),
        None => String::new(),
    }
}

/// Metadata of a freshly uploaded video, before the store assigns its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVideo {
    pub filename: String,
    pub s3_key: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub file_size: i64,
    pub duration: f64,
}

/// Sort key for video listings, always descending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoOrder {
    #[default]
    UploadDate,
    Title,
}

impl VideoOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadDate => "upload_date",
            Self::Title => "title",
        }
    }
}

impl FromStr for VideoOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upload_date" => Ok(Self::UploadDate),
            "title" => Ok(Self::Title),
            other => Err(format!("unknown order: {} (expected upload_date or title)", other)),
        }
    }
}

/// Filter and ordering for video listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoQuery {
    /// Case-insensitive substring of the title; blank matches everything
    pub search: Option<String>,
    pub order_by: VideoOrder,
}

impl VideoQuery {
    /// Trimmed search term, `None` when it would match everything
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub fn matches(&self, video: &VideoRecord) -> bool {
        self.search_term().is_none_or(|term| {
            video.title.to_lowercase().contains(&term.to_lowercase())
        })
    }
}

/// A video record paired with its time-limited fetch URL
#[derive(Debug, Clone, PartialEq)]
pub struct PublishableVideo {
    pub record: VideoRecord,
    pub video_url: String,
}

impl PublishableVideo {
    pub fn new(record: VideoRecord, video_url: impl Into<String>) -> Self {
        Self {
            record,
            video_url: video_url.into(),
        }
    }
}

// ============================================================================
// Requirements
// ============================================================================

/// Fixed content constraints of a platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformRequirements {
    pub max_file_size_mb: u64,
    pub max_duration_seconds: u64,
    pub supported_formats: &'static [&'static str],
    pub max_caption_length: usize,
}

impl PlatformRequirements {
    /// Check format, size and duration in that order
    pub fn check(&self, platform: Platform, video: &VideoRecord) -> Result<(), PublicationError> {
        let extension = video.extension();
        if !self.supported_formats.contains(&extension.as_str()) {
            return Err(PublicationError::UnsupportedFormat {
                platform,
                extension,
                supported: self.supported_formats.join(", "),
            });
        }

        let size_mb = video.file_size_mb();
        if size_mb > self.max_file_size_mb as f64 {
            return Err(PublicationError::FileTooLarge {
                platform,
                size_mb,
                max_mb: self.max_file_size_mb,
            });
        }

        if video.duration > self.max_duration_seconds as f64 {
            return Err(PublicationError::DurationExceeded {
                platform,
                duration: video.duration,
                max_seconds: self.max_duration_seconds,
            });
        }

        Ok(())
    }
}

// ============================================================================
// Publishing
// ============================================================================

/// What a platform reports back after a successful publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedMedia {
    #[serde(rename = "id")]
    pub remote_id: Option<String>,
    pub url: Option<String>,
    pub platform: Platform,
    pub status: String,
}

impl PublishedMedia {
    pub fn published(platform: Platform, remote_id: Option<String>, url: Option<String>) -> Self {
        Self {
            remote_id,
            url,
            platform,
            status: "published".to_string(),
        }
    }
}

/// Main trait for platform integrations
///
/// Implementations supply credential checks, their fixed requirements and the
/// platform's remote protocol. `publish` sequences them and should rarely be
/// overridden.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    fn platform(&self) -> Platform;

    fn platform_requirements(&self) -> PlatformRequirements;

    /// Fail on absent secrets, then make one authenticated request
    async fn validate_credentials(&self) -> Result<(), CredentialsError>;

    /// Run the platform's upload/publish steps
    async fn execute_protocol(
        &self,
        video: &PublishableVideo,
    ) -> Result<PublishedMedia, PublicationError>;

    /// Publish a video to the platform
    ///
    /// Partially uploaded remote state is left as is when a later step fails.
    async fn publish(&self, video: &PublishableVideo) -> Result<PublishedMedia, PublicationError> {
        let platform = self.platform();
        let title = video.record.title.as_str();
        info!(%platform, video_id = video.record.id, title, "attempting to publish video");

        let outcome: Result<PublishedMedia, PublicationError> = async {
            self.validate_credentials().await?;
            self.platform_requirements().check(platform, &video.record)?;
            self.execute_protocol(video).await
        }
        .await;

        match &outcome {
            Ok(media) => info!(
                %platform,
                video_id = video.record.id,
                remote_id = media.remote_id.as_deref().unwrap_or("-"),
                "published video"
            ),
            Err(err) => warn!(
                %platform,
                video_id = video.record.id,
                code = err.code(),
                "failed to publish video: {}",
                err
            ),
        }

        outcome
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn video_record() -> VideoRecord {
        VideoRecord {
            id: 42,
            filename: "launch.mp4".to_string(),
            s3_key: "videos/launch.mp4".to_string(),
            title: "Launch day".to_string(),
            description: "Behind the scenes".to_string(),
            tags: vec!["launch".to_string(), "behind the scenes".to_string()],
            file_size: 5 * 1024 * 1024,
            duration: 30.0,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    pub fn publishable_video() -> PublishableVideo {
        PublishableVideo::new(
            video_record(),
            "https://bucket.example.com/videos/launch.mp4?X-Amz-Expires=3600",
        )
    }
}
