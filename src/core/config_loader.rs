//! Configuration file loader for video-publisher
//!
//! This module provides configuration loading, environment overrides,
//! placeholder expansion and validation.

use super::config::*;
use crate::core::error::ConfigError;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file name looked up in the working directory
pub const CONFIG_FILENAME: &str = "video-publisher.yaml";

/// Longest lifetime S3 accepts for a presigned URL (7 days)
const MAX_PRESIGNED_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Environment variable pattern (${VAR_NAME})
static ENV_VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("environment variable pattern is valid")
});

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Explicit config file; must exist when given
    pub config_path: Option<PathBuf>,

    /// Directory searched for `video-publisher.yaml` when no path is given
    pub working_dir: Option<PathBuf>,

    /// Environment variables (highest priority)
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options backed by the current process environment
    pub fn from_process_env(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            working_dir: None,
            env: std::env::vars().collect(),
        }
    }
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "orchestration.maxConcurrency")
    pub field: String,

    /// Error message
    pub message: String,

    /// Expected type/value
    pub expected: Option<String>,

    /// Actual type/value
    pub actual: Option<String>,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. Environment variables
    /// 2. Config file (explicit path, or ./video-publisher.yaml)
    /// 3. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &options.config_path {
            Some(path) => Self::load_config_file(path).await?,
            None => {
                let dir = options.working_dir.clone().unwrap_or_else(|| PathBuf::from("."));
                let path = dir.join(CONFIG_FILENAME);
                if fs::try_exists(&path).await.unwrap_or(false) {
                    Self::load_config_file(&path).await?
                } else {
                    debug!(path = %path.display(), "no config file found, using defaults");
                    ServiceConfig::default()
                }
            }
        };

        Self::apply_env_overrides(&mut config, &options.env)?;
        Self::expand_env_vars(&mut config, &options.env);

        Ok(config)
    }

    /// Load configuration from a YAML file
    async fn load_config_file(path: &Path) -> Result<ServiceConfig, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::parse_yaml(&content)
    }

    fn parse_yaml(content: &str) -> Result<ServiceConfig, ConfigError> {
        if content.trim().is_empty() {
            return Ok(ServiceConfig::default());
        }

        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment variables on top of the file configuration
    fn apply_env_overrides(
        config: &mut ServiceConfig,
        env: &HashMap<String, String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = Self::parse_env::<u64>(env, "MAX_VIDEO_SIZE_MB")? {
            config.validation.max_video_size_mb = value;
        }

        if let Some(formats) = env.get("ALLOWED_VIDEO_FORMATS") {
            config.validation.allowed_formats = formats
                .split(',')
                .map(|format| format.trim().to_lowercase())
                .filter(|format| !format.is_empty())
                .collect();
        }

        if let Some(region) = env.get("AWS_REGION").filter(|v| !v.is_empty()) {
            config.storage.aws_region = region.clone();
        }

        if let Some(bucket) = env.get("S3_BUCKET_NAME").filter(|v| !v.is_empty()) {
            config.storage.bucket_name = Some(bucket.clone());
        }

        if let Some(ttl) = Self::parse_env::<u64>(env, "PRESIGNED_URL_TTL_SECONDS")? {
            config.storage.presigned_url_ttl_seconds = ttl;
        }

        if let Some(url) = env.get("DATABASE_URL").filter(|v| !v.is_empty()) {
            config.database.url = Some(url.clone());
        }

        if let Some(limit) = Self::parse_env::<usize>(env, "PUBLISH_MAX_CONCURRENCY")? {
            config.orchestration.max_concurrency = limit;
        }

        if let Some(seconds) = Self::parse_env::<u64>(env, "PUBLISH_PLATFORM_TIMEOUT_SECONDS")? {
            config.orchestration.platform_timeout_seconds = seconds;
        }

        Ok(())
    }

    fn parse_env<T: FromStr>(
        env: &HashMap<String, String>,
        name: &str,
    ) -> Result<Option<T>, ConfigError> {
        match env.get(name) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidEnv {
                    name: name.to_string(),
                    value: value.clone(),
                }),
        }
    }

    /// Expand `${VAR}` placeholders in string settings
    fn expand_env_vars(config: &mut ServiceConfig, env: &HashMap<String, String>) {
        if let Some(url) = &config.database.url {
            config.database.url = Some(Self::expand_string(url, env));
        }

        if let Some(bucket) = &config.storage.bucket_name {
            config.storage.bucket_name = Some(Self::expand_string(bucket, env));
        }

        config.storage.aws_region = Self::expand_string(&config.storage.aws_region, env);

        let endpoints = &mut config.endpoints;
        for endpoint in [
            &mut endpoints.instagram_graph,
            &mut endpoints.facebook_graph,
            &mut endpoints.tiktok_api,
            &mut endpoints.x_api,
            &mut endpoints.x_upload,
        ] {
            *endpoint = Self::expand_string(endpoint, env);
        }
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left in place.
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        ENV_VAR_REGEX
            .replace_all(input, |caps: &regex::Captures<'_>| {
                let var_name = &caps[1];
                match env.get(var_name) {
                    Some(value) => value.clone(),
                    None => {
                        warn!(variable = var_name, "environment variable not found");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Validate configuration
    pub fn validate(config: &ServiceConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        Self::validate_limits(config, &mut errors);
        Self::validate_storage(&config.storage, &mut errors, &mut warnings);

        if config.database.url.is_none() {
            warnings.push(ConfigValidationWarning {
                field: "database.url".to_string(),
                message: "No database configured".to_string(),
                suggestion: Some("Set DATABASE_URL to persist publication records".to_string()),
            });
        }

        Self::validate_endpoints(&config.endpoints, &mut errors);

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Validate numeric limits
    fn validate_limits(config: &ServiceConfig, errors: &mut Vec<ConfigValidationError>) {
        let positive = [
            (
                "validation.maxVideoSizeMb",
                config.validation.max_video_size_mb,
            ),
            (
                "orchestration.maxConcurrency",
                config.orchestration.max_concurrency as u64,
            ),
            (
                "orchestration.platformTimeoutSeconds",
                config.orchestration.platform_timeout_seconds,
            ),
            ("polling.maxAttempts", config.polling.max_attempts as u64),
        ];

        for (field, value) in positive {
            if value == 0 {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: format!("{} must be greater than zero", field),
                    expected: Some("positive integer".to_string()),
                    actual: Some("0".to_string()),
                });
            }
        }

        if config.validation.allowed_formats.is_empty() {
            errors.push(ConfigValidationError {
                field: "validation.allowedFormats".to_string(),
                message: "allowedFormats is required".to_string(),
                expected: Some("non-empty array".to_string()),
                actual: Some("empty array".to_string()),
            });
        }
    }

    /// Validate object storage settings
    fn validate_storage(
        storage: &StorageConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        if storage.presigned_url_ttl_seconds == 0
            || storage.presigned_url_ttl_seconds > MAX_PRESIGNED_TTL_SECONDS
        {
            errors.push(ConfigValidationError {
                field: "storage.presignedUrlTtlSeconds".to_string(),
                message: "presigned URL lifetime is out of range".to_string(),
                expected: Some(format!("1..={}", MAX_PRESIGNED_TTL_SECONDS)),
                actual: Some(storage.presigned_url_ttl_seconds.to_string()),
            });
        }

        if storage.bucket_name.is_none() {
            warnings.push(ConfigValidationWarning {
                field: "storage.bucketName".to_string(),
                message: "No bucket configured".to_string(),
                suggestion: Some("Set S3_BUCKET_NAME to generate video fetch URLs".to_string()),
            });
        }
    }

    /// Validate vendor endpoints
    fn validate_endpoints(endpoints: &EndpointsConfig, errors: &mut Vec<ConfigValidationError>) {
        let all = [
            ("endpoints.instagramGraph", &endpoints.instagram_graph),
            ("endpoints.facebookGraph", &endpoints.facebook_graph),
            ("endpoints.tiktokApi", &endpoints.tiktok_api),
            ("endpoints.xApi", &endpoints.x_api),
            ("endpoints.xUpload", &endpoints.x_upload),
        ];

        for (field, url) in all {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "endpoint must be an absolute http(s) URL".to_string(),
                    expected: Some("http(s)://host/path".to_string()),
                    actual: Some(url.to_string()),
                });
            }
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
                if let (Some(expected), Some(actual)) = (&error.expected, &error.actual) {
                    lines.push(format!("    Expected: {}", expected));
                    lines.push(format!("    Actual: {}", actual));
                }
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}
