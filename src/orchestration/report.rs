//! Publication results - per-platform outcomes, audit records and aggregates
//!
//! Features:
//! - One immutable result value per (video, platform) attempt
//! - Append-only audit records with a JSON payload
//! - Aggregate with derived success rate and overall status
//! - Markdown summary of a video's publication history

use crate::core::error::PublicationError;
use crate::core::traits::{Platform, PublishedMedia};
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Fixed message for platform names outside the registry
pub const PLATFORM_NOT_SUPPORTED: &str = "Platform not supported";

/// Outcome of a single platform attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationAttemptResult {
    pub platform: String,
    pub success: bool,
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublicationAttemptResult {
    pub fn succeeded(media: &PublishedMedia) -> Self {
        Self {
            platform: media.platform.as_str().to_string(),
            success: true,
            remote_id: media.remote_id.clone(),
            url: media.url.clone(),
            error: None,
        }
    }

    pub fn failed(platform: Platform, error: &PublicationError) -> Self {
        Self {
            platform: platform.as_str().to_string(),
            success: false,
            remote_id: None,
            url: None,
            error: Some(error.to_string()),
        }
    }

    /// Entry for a requested name that no publisher handles
    pub fn unsupported(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            success: false,
            remote_id: None,
            url: None,
            error: Some(PLATFORM_NOT_SUPPORTED.to_string()),
        }
    }
}

/// Persisted state of an audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Pending,
    Success,
    Failed,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PublicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown publication status: {}", other)),
        }
    }
}

/// Append-only audit row for one publish attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub video_id: i64,
    pub platform: Platform,
    pub status: PublicationStatus,
    pub publication_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PublicationRecord {
    /// Audit row for a successful attempt, carrying the published media
    pub fn success(video_id: i64, media: &PublishedMedia) -> Self {
        Self {
            video_id,
            platform: media.platform,
            status: PublicationStatus::Success,
            publication_data: serde_json::to_value(media).unwrap_or_default(),
            created_at: Utc::now(),
        }
    }

    /// Audit row for a failed attempt, carrying `{"error": message}`
    pub fn failure(video_id: i64, error: &PublicationError) -> Self {
        Self {
            video_id,
            platform: error.platform(),
            status: PublicationStatus::Failed,
            publication_data: serde_json::json!({ "error": error.to_string() }),
            created_at: Utc::now(),
        }
    }
}

/// Overall outcome of a multi-platform call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Success,
    Partial,
    Failed,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        })
    }
}

/// Per-call summary of all platform outcomes
///
/// Counts, rate and status are derived from the two lists, so they can never
/// drift from each other.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub video_id: i64,
    pub successful_publications: Vec<PublicationAttemptResult>,
    pub failed_publications: Vec<PublicationAttemptResult>,
    pub timestamp: DateTime<Utc>,
}

impl AggregateResult {
    pub fn new(video_id: i64) -> Self {
        Self {
            video_id,
            successful_publications: Vec::new(),
            failed_publications: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Route an attempt to the matching list
    pub fn record(&mut self, result: PublicationAttemptResult) {
        if result.success {
            self.successful_publications.push(result);
        } else {
            self.failed_publications.push(result);
        }
    }

    pub fn total_platforms(&self) -> usize {
        self.successful_count() + self.failed_count()
    }

    pub fn successful_count(&self) -> usize {
        self.successful_publications.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_publications.len()
    }

    /// Percentage of successful attempts, 0 when nothing was attempted
    pub fn success_rate(&self) -> f64 {
        let total = self.total_platforms();
        if total == 0 {
            return 0.0;
        }
        self.successful_count() as f64 / total as f64 * 100.0
    }

    pub fn overall_status(&self) -> OverallStatus {
        if self.failed_count() == 0 {
            OverallStatus::Success
        } else if self.successful_count() > 0 {
            OverallStatus::Partial
        } else {
            OverallStatus::Failed
        }
    }
}

impl Serialize for AggregateResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AggregateResult", 9)?;
        state.serialize_field("video_id", &self.video_id)?;
        state.serialize_field("successful_publications", &self.successful_publications)?;
        state.serialize_field("failed_publications", &self.failed_publications)?;
        state.serialize_field("total_platforms", &self.total_platforms())?;
        state.serialize_field("successful_count", &self.successful_count())?;
        state.serialize_field("failed_count", &self.failed_count())?;
        state.serialize_field("success_rate", &round2(self.success_rate()))?;
        state.serialize_field("overall_status", &self.overall_status())?;
        state.serialize_field("timestamp", &self.timestamp.to_rfc3339())?;
        state.end()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Publication history of one video, most recent first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicationStatusReport {
    pub video_id: i64,
    pub publications: Vec<PublicationRecord>,
}

impl PublicationStatusReport {
    pub fn from_records(video_id: i64, mut publications: Vec<PublicationRecord>) -> Self {
        publications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            video_id,
            publications,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }

    /// Markdown table of the history
    pub fn to_markdown(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("# Publication History for Video {}\n", self.video_id));

        if self.publications.is_empty() {
            lines.push("No publications recorded.".to_string());
            return lines.join("\n");
        }

        lines.push("| Timestamp | Platform | Status | Details |".to_string());
        lines.push("|-----------|----------|--------|---------|".to_string());

        for record in &self.publications {
            let status = match record.status {
                PublicationStatus::Success => "✅ Success",
                PublicationStatus::Failed => "❌ Failed",
                PublicationStatus::Pending => "⏳ Pending",
            };
            let details = record
                .publication_data
                .get("url")
                .or_else(|| record.publication_data.get("error"))
                .and_then(|value| value.as_str())
                .unwrap_or("-");

            lines.push(format!(
                "| {} | {} | {} | {} |",
                record.created_at.format("%Y-%m-%d %H:%M:%S"),
                record.platform,
                status,
                details
            ));
        }
        lines.push(String::new());

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn media(platform: Platform) -> PublishedMedia {
        PublishedMedia::published(
            platform,
            Some("17890".to_string()),
            Some("https://www.instagram.com/p/17890/".to_string()),
        )
    }

    #[test]
    fn test_unsupported_entry() {
        let result = PublicationAttemptResult::unsupported("bluesky");
        assert_eq!(result.platform, "bluesky");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Platform not supported"));
    }

    #[test]
    fn test_empty_aggregate_is_success() {
        let aggregate = AggregateResult::new(42);
        assert_eq!(aggregate.total_platforms(), 0);
        assert_eq!(aggregate.success_rate(), 0.0);
        assert_eq!(aggregate.overall_status(), OverallStatus::Success);
    }

    #[test]
    fn test_partial_aggregate() {
        let mut aggregate = AggregateResult::new(42);
        aggregate.record(PublicationAttemptResult::succeeded(&media(Platform::Instagram)));
        aggregate.record(PublicationAttemptResult::unsupported("bluesky"));

        assert_eq!(aggregate.total_platforms(), 2);
        assert_eq!(aggregate.successful_count(), 1);
        assert_eq!(aggregate.failed_count(), 1);
        assert_eq!(aggregate.success_rate(), 50.0);
        assert_eq!(aggregate.overall_status(), OverallStatus::Partial);
    }

    #[test]
    fn test_all_failed_aggregate() {
        let mut aggregate = AggregateResult::new(42);
        let error = PublicationError::MediaProcessingFailed {
            platform: Platform::Instagram,
        };
        aggregate.record(PublicationAttemptResult::failed(Platform::Instagram, &error));

        assert_eq!(aggregate.overall_status(), OverallStatus::Failed);
        assert_eq!(
            aggregate.failed_publications[0].error.as_deref(),
            Some("Instagram media processing failed")
        );
    }

    #[test]
    fn test_aggregate_serialization_includes_derived_fields() {
        let mut aggregate = AggregateResult::new(7);
        aggregate.record(PublicationAttemptResult::succeeded(&media(Platform::Instagram)));
        aggregate.record(PublicationAttemptResult::unsupported("a"));
        aggregate.record(PublicationAttemptResult::unsupported("b"));

        let json = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(json["video_id"], 7);
        assert_eq!(json["total_platforms"], 3);
        assert_eq!(json["successful_count"], 1);
        assert_eq!(json["failed_count"], 2);
        assert_eq!(json["success_rate"], 33.33);
        assert_eq!(json["overall_status"], "partial");
        assert_eq!(json["successful_publications"][0]["id"], "17890");
        assert!(json["failed_publications"][0].get("id").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_record_payloads() {
        let record = PublicationRecord::success(42, &media(Platform::Instagram));
        assert_eq!(record.status, PublicationStatus::Success);
        assert_eq!(record.publication_data["status"], "published");
        assert_eq!(record.publication_data["id"], "17890");

        let error = PublicationError::Timeout {
            platform: Platform::X,
            seconds: 300,
        };
        let record = PublicationRecord::failure(42, &error);
        assert_eq!(record.platform, Platform::X);
        assert_eq!(record.status, PublicationStatus::Failed);
        assert_eq!(
            record.publication_data,
            serde_json::json!({ "error": "X publication timed out after 300s" })
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PublicationStatus::Pending,
            PublicationStatus::Success,
            PublicationStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<PublicationStatus>(), Ok(status));
        }
        assert!("done".parse::<PublicationStatus>().is_err());
    }

    #[test]
    fn test_status_report_orders_by_recency() {
        let older = PublicationRecord {
            created_at: Utc::now() - Duration::hours(1),
            ..PublicationRecord::success(42, &media(Platform::Instagram))
        };
        let newer = PublicationRecord::failure(
            42,
            &PublicationError::MediaProcessingFailed {
                platform: Platform::Facebook,
            },
        );

        let report = PublicationStatusReport::from_records(42, vec![older.clone(), newer.clone()]);
        assert_eq!(report.publications, vec![newer, older]);

        let markdown = report.to_markdown();
        assert!(markdown.contains("# Publication History for Video 42"));
        assert!(markdown.contains("❌ Failed"));
        assert!(markdown.contains("https://www.instagram.com/p/17890/"));
    }

    #[test]
    fn test_empty_status_report() {
        let report = PublicationStatusReport::from_records(9, Vec::new());
        assert!(report.is_empty());
        assert!(report.to_markdown().contains("No publications recorded."));
    }
}
