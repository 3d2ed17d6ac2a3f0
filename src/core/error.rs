//! Error handling for video publication
//!
//! One `thiserror` enum per concern. Validation errors are user-correctable,
//! credential and publication errors are scoped to a single platform, and
//! storage/configuration errors describe the collaborators around the core.

use crate::core::traits::Platform;
use thiserror::Error;

/// Precondition failures detected before any platform is contacted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Video not found with the provided ID: {video_id}")]
    VideoNotFound { video_id: i64 },

    #[error("At least one platform is required")]
    NoPlatforms,

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Video URL is invalid or not accessible")]
    InvalidVideoUrl,

    #[error("Unsupported video format '{extension}'. Allowed formats: {allowed}")]
    UnsupportedFormat { extension: String, allowed: String },

    #[error("Invalid or missing video file size")]
    InvalidFileSize,

    #[error("File size ({size_mb:.2}MB) exceeds maximum allowed size ({max_mb}MB)")]
    FileTooLarge { size_mb: f64, max_mb: u64 },
}

impl ValidationError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::VideoNotFound { .. } => "VIDEO_NOT_FOUND",
            Self::NoPlatforms => "MISSING_PLATFORMS",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::InvalidVideoUrl => "VIDEO_URL_INVALID",
            Self::UnsupportedFormat { .. } => "INVALID_FILE_FORMAT",
            Self::InvalidFileSize => "INVALID_FILE_SIZE",
            Self::FileTooLarge { .. } => "FILE_SIZE_EXCEEDED",
        }
    }
}

/// Platform misconfiguration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialsError {
    /// A required secret is absent or empty
    #[error("{platform} credentials not configured: {field} is missing")]
    Missing {
        platform: Platform,
        field: &'static str,
    },

    /// The platform rejected the configured credentials
    #[error("{platform} credential validation failed: {message}")]
    Invalid { platform: Platform, message: String },
}

impl CredentialsError {
    pub fn platform(&self) -> Platform {
        match self {
            Self::Missing { platform, .. } | Self::Invalid { platform, .. } => *platform,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "CREDENTIALS_MISSING",
            Self::Invalid { .. } => "CREDENTIALS_INVALID",
        }
    }
}

/// A single platform's publication failure
///
/// These never abort a batch; the orchestrator turns them into failed entries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublicationError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("Unsupported video format '{extension}' for {platform}. Supported formats: {supported}")]
    UnsupportedFormat {
        platform: Platform,
        extension: String,
        supported: String,
    },

    #[error("Video size ({size_mb:.2}MB) exceeds {platform} limit ({max_mb}MB)")]
    FileTooLarge {
        platform: Platform,
        size_mb: f64,
        max_mb: u64,
    },

    #[error("Video duration ({duration}s) exceeds {platform} limit ({max_seconds}s)")]
    DurationExceeded {
        platform: Platform,
        duration: f64,
        max_seconds: u64,
    },

    #[error("{platform} media processing failed")]
    MediaProcessingFailed { platform: Platform },

    #[error("{platform} media processing timeout after {attempts} status checks")]
    MediaProcessingTimeout { platform: Platform, attempts: u32 },

    #[error("{platform} {step} failed with status {status}: {body}")]
    Api {
        platform: Platform,
        step: &'static str,
        status: u16,
        body: String,
    },

    #[error("{platform} {step} request failed: {message}")]
    Network {
        platform: Platform,
        step: &'static str,
        message: String,
    },

    #[error("{platform} returned an unexpected {step} response: {message}")]
    InvalidResponse {
        platform: Platform,
        step: &'static str,
        message: String,
    },

    #[error("{platform} publication timed out after {seconds}s")]
    Timeout { platform: Platform, seconds: u64 },
}

impl PublicationError {
    /// Platform the failure belongs to
    pub fn platform(&self) -> Platform {
        match self {
            Self::Credentials(err) => err.platform(),
            Self::UnsupportedFormat { platform, .. }
            | Self::FileTooLarge { platform, .. }
            | Self::DurationExceeded { platform, .. }
            | Self::MediaProcessingFailed { platform }
            | Self::MediaProcessingTimeout { platform, .. }
            | Self::Api { platform, .. }
            | Self::Network { platform, .. }
            | Self::InvalidResponse { platform, .. }
            | Self::Timeout { platform, .. } => *platform,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Credentials(err) => err.code(),
            Self::UnsupportedFormat { .. } => "FILE_FORMAT_UNSUPPORTED",
            Self::FileTooLarge { .. } => "FILE_SIZE_EXCEEDED",
            Self::DurationExceeded { .. } => "VIDEO_DURATION_EXCEEDED",
            Self::MediaProcessingFailed { .. } => "MEDIA_PROCESSING_FAILED",
            Self::MediaProcessingTimeout { .. } => "MEDIA_PROCESSING_TIMEOUT",
            Self::Api { .. } => "PLATFORM_API_ERROR",
            Self::Network { .. } => "NETWORK_CONNECTION_ERROR",
            Self::InvalidResponse { .. } => "INVALID_PLATFORM_RESPONSE",
            Self::Timeout { .. } => "TIMEOUT_ERROR",
        }
    }
}

/// Failures of the object store or the relational store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Video file not found in storage: {key}")]
    ObjectNotFound { key: String },

    #[error("Access denied to storage object: {key}")]
    AccessDenied { key: String },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Database query execution failed: {0}")]
    Query(String),
}

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ObjectNotFound { .. } => "S3_OBJECT_NOT_FOUND",
            Self::AccessDenied { .. } => "S3_ACCESS_DENIED",
            Self::Backend(_) => "AWS_CONNECTION_FAILED",
            Self::Query(_) => "DATABASE_QUERY_FAILED",
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Query(err.to_string())
    }
}

/// Configuration loading and validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse YAML config: {0}")]
    Parse(String),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("Required configuration parameter missing: {0}")]
    Missing(&'static str),
}

/// Call-level failure of the orchestrator
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Propagated unwrapped so callers can surface it as a client error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Publication failed: {0}")]
    Orchestration(#[from] StorageError),
}

impl ServiceError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.code(),
            Self::Orchestration(_) => "ORCHESTRATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let error = ValidationError::MissingField { field: "s3_key" };
        assert_eq!(error.to_string(), "Missing required field: s3_key");
        assert_eq!(error.code(), "MISSING_FIELD");

        let error = ValidationError::FileTooLarge {
            size_mb: 150.456,
            max_mb: 100,
        };
        assert!(error.to_string().contains("150.46MB"));
        assert!(error.to_string().contains("(100MB)"));
    }

    #[test]
    fn test_credentials_error_platform() {
        let error = CredentialsError::Missing {
            platform: Platform::TikTok,
            field: "TIKTOK_ACCESS_TOKEN",
        };

        assert_eq!(error.platform(), Platform::TikTok);
        assert_eq!(error.code(), "CREDENTIALS_MISSING");
        assert!(error.to_string().starts_with("TikTok credentials not configured"));
    }

    #[test]
    fn test_publication_error_wraps_credentials() {
        let error: PublicationError = CredentialsError::Invalid {
            platform: Platform::X,
            message: "401 Unauthorized".to_string(),
        }
        .into();

        assert_eq!(error.platform(), Platform::X);
        assert_eq!(error.code(), "CREDENTIALS_INVALID");
        assert_eq!(
            error.to_string(),
            "X credential validation failed: 401 Unauthorized"
        );
    }

    #[test]
    fn test_publication_error_duration_exceeded() {
        let error = PublicationError::DurationExceeded {
            platform: Platform::Instagram,
            duration: 75.0,
            max_seconds: 60,
        };

        assert_eq!(error.code(), "VIDEO_DURATION_EXCEEDED");
        assert_eq!(
            error.to_string(),
            "Video duration (75s) exceeds Instagram limit (60s)"
        );
    }

    #[test]
    fn test_media_timeout_message() {
        let error = PublicationError::MediaProcessingTimeout {
            platform: Platform::Instagram,
            attempts: 10,
        };

        assert_eq!(error.platform(), Platform::Instagram);
        assert!(error.to_string().contains("timeout"));
    }

    #[test]
    fn test_service_error_classification() {
        let error: ServiceError = ValidationError::InvalidFileSize.into();
        assert!(error.is_client_error());
        assert_eq!(error.code(), "INVALID_FILE_SIZE");
        assert_eq!(error.to_string(), "Invalid or missing video file size");

        let error: ServiceError = StorageError::Query("connection reset".to_string()).into();
        assert!(!error.is_client_error());
        assert_eq!(error.code(), "ORCHESTRATION_ERROR");
        assert!(error.to_string().starts_with("Publication failed:"));
    }
}
