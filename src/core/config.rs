//! Configuration structures and types for video-publisher
//!
//! This module provides type-safe configuration management with serde support.
//! Every section has defaults, so an empty YAML document is a valid config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::polling::PollOptions;

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Global video constraints checked before any platform is contacted
    pub validation: ValidationConfig,

    /// Object storage settings
    pub storage: StorageConfig,

    /// Relational store settings
    pub database: DatabaseConfig,

    /// Fan-out settings
    pub orchestration: OrchestrationConfig,

    /// Media processing status checks
    pub polling: PollingConfig,

    /// Vendor API base URLs
    pub endpoints: EndpointsConfig,
}

/// Video validation limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum accepted file size in MB (default: 100)
    #[serde(rename = "maxVideoSizeMb")]
    pub max_video_size_mb: u64,

    /// Accepted lower-case extensions (default: mp4, mov, avi)
    #[serde(rename = "allowedFormats")]
    pub allowed_formats: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_video_size_mb: 100,
            allowed_formats: vec!["mp4".to_string(), "mov".to_string(), "avi".to_string()],
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// AWS region (default: "us-east-1")
    #[serde(rename = "awsRegion")]
    pub aws_region: String,

    /// Bucket holding the uploaded videos
    #[serde(skip_serializing_if = "Option::is_none", rename = "bucketName")]
    pub bucket_name: Option<String>,

    /// Lifetime of generated fetch URLs (default: 3600)
    #[serde(rename = "presignedUrlTtlSeconds")]
    pub presigned_url_ttl_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            aws_region: "us-east-1".to_string(),
            bucket_name: None,
            presigned_url_ttl_seconds: 3600,
        }
    }
}

impl StorageConfig {
    pub fn presigned_url_ttl(&self) -> Duration {
        Duration::from_secs(self.presigned_url_ttl_seconds)
    }
}

/// Relational store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection URL (environment variable expansion supported)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Attempts in flight at once, 1 means sequential (default: 4)
    #[serde(rename = "maxConcurrency")]
    pub max_concurrency: usize,

    /// Upper bound for one platform's full protocol (default: 300)
    #[serde(rename = "platformTimeoutSeconds")]
    pub platform_timeout_seconds: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            platform_timeout_seconds: 300,
        }
    }
}

impl OrchestrationConfig {
    pub fn platform_timeout(&self) -> Duration {
        Duration::from_secs(self.platform_timeout_seconds)
    }
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Status checks before giving up (default: 10)
    #[serde(rename = "maxAttempts")]
    pub max_attempts: u32,

    /// Delay between checks in milliseconds (default: 5000)
    #[serde(rename = "intervalMs")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval_ms: 5000,
        }
    }
}

impl PollingConfig {
    pub fn options(&self) -> PollOptions {
        PollOptions {
            max_attempts: self.max_attempts,
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

/// Vendor API base URLs
///
/// Overridable so that tests can point publishers at a local fake server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Instagram Graph API base (default: "https://graph.facebook.com/v18.0")
    #[serde(rename = "instagramGraph")]
    pub instagram_graph: String,

    /// Facebook Graph API base (default: "https://graph.facebook.com/v18.0")
    #[serde(rename = "facebookGraph")]
    pub facebook_graph: String,

    /// TikTok Open API base (default: "https://open.tiktokapis.com/v2")
    #[serde(rename = "tiktokApi")]
    pub tiktok_api: String,

    /// X API v2 base (default: "https://api.twitter.com/2")
    #[serde(rename = "xApi")]
    pub x_api: String,

    /// X media upload base (default: "https://upload.twitter.com/1.1")
    #[serde(rename = "xUpload")]
    pub x_upload: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            instagram_graph: "https://graph.facebook.com/v18.0".to_string(),
            facebook_graph: "https://graph.facebook.com/v18.0".to_string(),
            tiktok_api: "https://open.tiktokapis.com/v2".to_string(),
            x_api: "https://api.twitter.com/2".to_string(),
            x_upload: "https://upload.twitter.com/1.1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.validation.max_video_size_mb, 100);
        assert_eq!(config.validation.allowed_formats, vec!["mp4", "mov", "avi"]);
        assert_eq!(config.storage.aws_region, "us-east-1");
        assert_eq!(config.storage.presigned_url_ttl(), Duration::from_secs(3600));
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_serialize_config() {
        let config = ServiceConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("maxVideoSizeMb: 100"));
        assert!(yaml.contains("platformTimeoutSeconds: 300"));
        assert!(!yaml.contains("bucketName"));
    }

    #[test]
    fn test_deserialize_empty_config() {
        let config: ServiceConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let yaml = r#"
storage:
  bucketName: socialman-videos
orchestration:
  maxConcurrency: 1
polling:
  intervalMs: 10
"#;
        let config: ServiceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.storage.bucket_name.as_deref(), Some("socialman-videos"));
        assert_eq!(config.storage.aws_region, "us-east-1");
        assert_eq!(config.orchestration.max_concurrency, 1);
        assert_eq!(config.orchestration.platform_timeout_seconds, 300);
        assert_eq!(config.polling.max_attempts, 10);
        assert_eq!(config.polling.options().interval, Duration::from_millis(10));
    }

    #[test]
    fn test_endpoint_defaults() {
        let endpoints = EndpointsConfig::default();
        assert!(endpoints.instagram_graph.ends_with("/v18.0"));
        assert_eq!(endpoints.tiktok_api, "https://open.tiktokapis.com/v2");
        assert_eq!(endpoints.x_upload, "https://upload.twitter.com/1.1");
    }
}
