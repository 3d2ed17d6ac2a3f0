//! Video Validator - checks a video against global limits
//!
//! Runs once per publication request, before any platform is contacted, and
//! once per upload before anything is written. Checks are fail-fast: required
//! fields, fetch URL, format, then size.
//!
//! # Example
//!
//! ```
//! use video_publisher::core::ValidationConfig;
//! use video_publisher::validation::VideoValidator;
//!
//! let validator = VideoValidator::new(&ValidationConfig::default());
//! assert!(validator.is_allowed_format("MOV"));
//! assert!(!validator.is_allowed_format("mkv"));
//! ```

use crate::core::config::ValidationConfig;
use crate::core::error::ValidationError;
use crate::core::traits::{PublishableVideo, file_extension};
use reqwest::Url;

const BYTES_PER_MB: i64 = 1024 * 1024;

/// Validator for publishable videos
#[derive(Debug, Clone)]
pub struct VideoValidator {
    max_video_size_mb: u64,
    allowed_formats: Vec<String>,
}

impl Default for VideoValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl VideoValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            max_video_size_mb: config.max_video_size_mb,
            allowed_formats: config
                .allowed_formats
                .iter()
                .map(|format| format.trim().to_lowercase())
                .collect(),
        }
    }

    /// Validate a video, returning the first failed check
    pub fn validate(&self, video: &PublishableVideo) -> Result<(), ValidationError> {
        self.check_required_fields(video)?;
        self.check_video_url(&video.video_url)?;

        self.check_format(&video.record.extension())?;
        self.check_file_size(video.record.file_size)
    }

    /// Validate a local file before it is uploaded
    pub fn validate_upload(
        &self,
        filename: &str,
        title: &str,
        file_size: i64,
    ) -> Result<(), ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "filename" });
        }
        if title.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "title" });
        }

        self.check_format(&file_extension(filename))?;
        self.check_file_size(file_size)
    }

    pub fn is_allowed_format(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.allowed_formats.iter().any(|format| *format == extension)
    }

    fn check_format(&self, extension: &str) -> Result<(), ValidationError> {
        if self.is_allowed_format(extension) {
            return Ok(());
        }
        Err(ValidationError::UnsupportedFormat {
            extension: extension.to_string(),
            allowed: self.allowed_formats.join(", "),
        })
    }

    fn check_required_fields(&self, video: &PublishableVideo) -> Result<(), ValidationError> {
        let record = &video.record;
        let missing = if record.id == 0 {
            Some("id")
        } else if record.filename.trim().is_empty() {
            Some("filename")
        } else if record.s3_key.trim().is_empty() {
            Some("s3_key")
        } else if video.video_url.trim().is_empty() {
            Some("video_url")
        } else {
            None
        };

        match missing {
            Some(field) => Err(ValidationError::MissingField { field }),
            None => Ok(()),
        }
    }

    /// The fetch URL must be an absolute http(s) URL with a host
    fn check_video_url(&self, video_url: &str) -> Result<(), ValidationError> {
        let url = Url::parse(video_url.trim()).map_err(|_| ValidationError::InvalidVideoUrl)?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(()),
            _ => Err(ValidationError::InvalidVideoUrl),
        }
    }

    fn check_file_size(&self, file_size: i64) -> Result<(), ValidationError> {
        if file_size <= 0 {
            return Err(ValidationError::InvalidFileSize);
        }

        // A limit beyond the i64 byte range admits every size
        let max_bytes = i64::try_from(self.max_video_size_mb)
            .ok()
            .and_then(|mb| mb.checked_mul(BYTES_PER_MB));
        if max_bytes.is_some_and(|max_bytes| file_size > max_bytes) {
            return Err(ValidationError::FileTooLarge {
                size_mb: file_size as f64 / BYTES_PER_MB as f64,
                max_mb: self.max_video_size_mb,
            });
        }

        Ok(())
    }
}
