//! Publication Service - publishes one stored video to several platforms
//!
//! Features:
//! - Single validation pass before any platform is contacted
//! - Bounded concurrency, 1 means strictly sequential
//! - Per-platform timeout covering the full protocol
//! - One audit record per supported platform attempt
//! - Results reported in caller order

use crate::core::config::ServiceConfig;
use crate::core::error::{PublicationError, ServiceError, ValidationError};
use crate::core::traits::{
    Platform, PublishableVideo, PublishedMedia, VideoQuery, VideoRecord,
};
use crate::orchestration::report::{
    AggregateResult, OverallStatus, PublicationAttemptResult, PublicationRecord,
    PublicationStatusReport,
};
use crate::platforms::PublisherRegistry;
use crate::storage::{ObjectStore, VideoRepository};
use crate::validation::VideoValidator;
use futures::StreamExt;
use futures::stream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fan-out options
#[derive(Debug, Clone, PartialEq)]
pub struct PublicationOptions {
    /// Attempts in flight at once (default: 4)
    pub max_concurrency: usize,

    /// Upper bound for one platform's full protocol (default: 300s)
    pub platform_timeout: Duration,

    /// Lifetime of the fetch URL handed to platforms (default: 3600s)
    pub fetch_url_ttl: Duration,
}

impl Default for PublicationOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            platform_timeout: Duration::from_secs(300),
            fetch_url_ttl: Duration::from_secs(3600),
        }
    }
}

impl PublicationOptions {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            max_concurrency: config.orchestration.max_concurrency,
            platform_timeout: config.orchestration.platform_timeout(),
            fetch_url_ttl: config.storage.presigned_url_ttl(),
        }
    }
}

/// Outcome of one requested platform name
enum Attempt {
    Unsupported(String),
    Finished(Platform, Result<PublishedMedia, PublicationError>),
}

/// PublicationService - coordinates validation, publishers and the audit trail
pub struct PublicationService {
    repository: Arc<dyn VideoRepository>,
    object_store: Arc<dyn ObjectStore>,
    registry: PublisherRegistry,
    validator: VideoValidator,
    options: PublicationOptions,
}

impl PublicationService {
    pub fn new(
        repository: Arc<dyn VideoRepository>,
        object_store: Arc<dyn ObjectStore>,
        registry: PublisherRegistry,
        validator: VideoValidator,
        options: PublicationOptions,
    ) -> Self {
        Self {
            repository,
            object_store,
            registry,
            validator,
            options,
        }
    }

    /// Publish a stored video to every requested platform
    ///
    /// Validation failures abort before any platform is attempted. After that
    /// every requested name yields exactly one entry in the aggregate; a
    /// failing platform never prevents the others. Unknown names get a failed
    /// entry and are neither attempted nor persisted.
    ///
    /// Dropping the returned future cancels the attempts still in flight.
    pub async fn publish_video(
        &self,
        video_id: i64,
        platforms: &[String],
    ) -> Result<AggregateResult, ServiceError> {
        if platforms.is_empty() {
            return Err(ValidationError::NoPlatforms.into());
        }

        let video = self.resolve_video(video_id).await?;
        self.validator.validate(&video)?;

        info!(
            video_id,
            platforms = %platforms.join(","),
            max_concurrency = self.options.max_concurrency,
            "publishing video to {} platforms",
            platforms.len()
        );

        let mut aggregate = AggregateResult::new(video_id);
        let mut attempts = stream::iter(platforms.iter().map(|name| self.attempt(name, &video)))
            .buffered(self.options.max_concurrency.max(1));

        while let Some(attempt) = attempts.next().await {
            let result = match attempt {
                Attempt::Unsupported(name) => {
                    warn!(video_id, platform = %name, "requested platform is not supported");
                    PublicationAttemptResult::unsupported(name)
                }
                Attempt::Finished(platform, outcome) => {
                    let (record, result) = match &outcome {
                        Ok(media) => (
                            PublicationRecord::success(video_id, media),
                            PublicationAttemptResult::succeeded(media),
                        ),
                        Err(err) => (
                            PublicationRecord::failure(video_id, err),
                            PublicationAttemptResult::failed(platform, err),
                        ),
                    };
                    self.repository.append_publication(&record).await?;
                    debug!(video_id, %platform, status = %record.status, "publication recorded");
                    result
                }
            };
            aggregate.record(result);
        }

        info!(
            video_id,
            successful = aggregate.successful_count(),
            failed = aggregate.failed_count(),
            status = %aggregate.overall_status(),
            "publication finished"
        );

        Ok(aggregate)
    }

    /// Persisted publication history of a video, most recent first
    pub async fn publication_status(
        &self,
        video_id: i64,
    ) -> Result<PublicationStatusReport, ServiceError> {
        let records = self.repository.publications_for(video_id).await?;
        Ok(PublicationStatusReport::from_records(video_id, records))
    }

    pub async fn list_videos(&self, query: &VideoQuery) -> Result<Vec<VideoRecord>, ServiceError> {
        Ok(self.repository.list_videos(query).await?)
    }

    pub fn available_platforms(&self) -> Vec<Platform> {
        self.registry.available_platforms()
    }

    /// Look the video up and pair it with a fresh fetch URL
    async fn resolve_video(&self, video_id: i64) -> Result<PublishableVideo, ServiceError> {
        let record = self
            .repository
            .find_video(video_id)
            .await?
            .ok_or(ValidationError::VideoNotFound { video_id })?;

        // The validator reports the missing key; no URL can be signed for it.
        let video_url = if record.s3_key.trim().is_empty() {
            String::new()
        } else {
            self.object_store
                .generate_fetch_url(&record.s3_key, self.options.fetch_url_ttl)
                .await?
        };

        Ok(PublishableVideo::new(record, video_url))
    }

    async fn attempt(&self, name: &str, video: &PublishableVideo) -> Attempt {
        let Some(publisher) = self.registry.resolve(name) else {
            return Attempt::Unsupported(name.to_string());
        };
        let platform = publisher.platform();
        let timeout = self.options.platform_timeout;

        let outcome = match tokio::time::timeout(timeout, publisher.publish(video)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let err = PublicationError::Timeout {
                    platform,
                    seconds: timeout.as_secs(),
                };
                warn!(%platform, video_id = video.record.id, code = err.code(), "{}", err);
                Err(err)
            }
        };

        Attempt::Finished(platform, outcome)
    }

    /// Print a publication summary
    pub fn print_summary(result: &AggregateResult) {
        println!("\n{}", "=".repeat(60));
        println!("📊 Publication Summary for Video {}", result.video_id);
        println!("{}", "=".repeat(60));

        println!("\n✅ Succeeded: {}", result.successful_count());
        for publication in &result.successful_publications {
            println!(
                "   - {}: {}",
                publication.platform,
                publication
                    .url
                    .as_deref()
                    .or(publication.remote_id.as_deref())
                    .unwrap_or("published")
            );
        }

        println!("\n❌ Failed: {}", result.failed_count());
        for publication in &result.failed_publications {
            println!(
                "   - {}: {}",
                publication.platform,
                publication.error.as_deref().unwrap_or("Unknown error")
            );
        }

        println!("\n{}", "=".repeat(60));
        let status = match result.overall_status() {
            OverallStatus::Success => "✅ SUCCESS",
            OverallStatus::Partial => "🟡 PARTIAL",
            OverallStatus::Failed => "❌ FAILED",
        };
        println!(
            "Overall Status: {} ({:.2}% of {} platforms)",
            status,
            result.success_rate(),
            result.total_platforms()
        );
        println!("{}\n", "=".repeat(60));
    }
}
