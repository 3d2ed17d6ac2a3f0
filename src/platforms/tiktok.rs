//! TikTok Plugin - Direct Post through the Content Posting API
//!
//! The source video is downloaded first so that the init request can declare
//! its real size and chunk layout. Chunks are then PUT to the upload URL
//! returned by init, and the post is committed with the caption as title.

use crate::core::error::{CredentialsError, PublicationError};
use crate::core::traits::{
    Platform, PlatformPublisher, PlatformRequirements, PublishableVideo, PublishedMedia,
};
use crate::platforms::caption::prepare_caption;
use crate::platforms::http::ApiClient;
use crate::security::PlatformSecrets;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CLIENT_KEY: &str = "TIKTOK_CLIENT_KEY";
pub const CLIENT_SECRET: &str = "TIKTOK_CLIENT_SECRET";
pub const ACCESS_TOKEN: &str = "TIKTOK_ACCESS_TOKEN";

pub const REQUIREMENTS: PlatformRequirements = PlatformRequirements {
    max_file_size_mb: 128,
    max_duration_seconds: 180,
    supported_formats: &["mp4", "mov", "avi"],
    max_caption_length: 150,
};

/// Nominal upload chunk size
pub const CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Chunk layout declared in the init request
///
/// All chunks are `chunk_size` bytes except the last one, which also carries
/// the remainder. A video no larger than one chunk is uploaded whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub video_size: u64,
    pub chunk_size: u64,
    pub total_chunk_count: u64,
}

impl ChunkPlan {
    pub fn for_size(video_size: u64) -> Self {
        if video_size <= CHUNK_SIZE {
            return Self {
                video_size,
                chunk_size: video_size,
                total_chunk_count: 1,
            };
        }

        Self {
            video_size,
            chunk_size: CHUNK_SIZE,
            total_chunk_count: video_size / CHUNK_SIZE,
        }
    }

    /// Inclusive byte ranges, one per chunk
    pub fn ranges(&self) -> Vec<(u64, u64)> {
        (0..self.total_chunk_count)
            .map(|index| {
                let start = index * self.chunk_size;
                let end = if index + 1 == self.total_chunk_count {
                    self.video_size - 1
                } else {
                    start + self.chunk_size - 1
                };
                (start, end)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
struct PostInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    privacy_level: &'static str,
    disable_duet: bool,
    disable_comment: bool,
    disable_stitch: bool,
    video_cover_timestamp_ms: u64,
}

impl<'a> PostInfo<'a> {
    fn public(title: Option<&'a str>) -> Self {
        Self {
            title,
            privacy_level: "PUBLIC_TO_EVERYONE",
            disable_duet: false,
            disable_comment: false,
            disable_stitch: false,
            video_cover_timestamp_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize)]
struct SourceInfo {
    source: &'static str,
    video_size: u64,
    chunk_size: u64,
    total_chunk_count: u64,
}

#[derive(Debug, Serialize)]
struct InitRequest<'a> {
    post_info: PostInfo<'a>,
    source_info: SourceInfo,
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    post_info: PostInfo<'a>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct InitData {
    upload_url: String,
    publish_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitData {
    publish_id: Option<String>,
    share_url: Option<String>,
}

/// TikTok publisher
pub struct TikTokPublisher {
    api: ApiClient,
    base_url: String,
    secrets: PlatformSecrets,
}

impl TikTokPublisher {
    pub fn new(http: Client, base_url: impl Into<String>, secrets: PlatformSecrets) -> Self {
        Self {
            api: ApiClient::new(http, Platform::TikTok, secrets.masker()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secrets,
        }
    }

    async fn initialize_upload(
        &self,
        plan: &ChunkPlan,
        access_token: &str,
    ) -> Result<InitData, PublicationError> {
        let body = InitRequest {
            post_info: PostInfo::public(None),
            source_info: SourceInfo {
                source: "FILE_UPLOAD",
                video_size: plan.video_size,
                chunk_size: plan.chunk_size,
                total_chunk_count: plan.total_chunk_count,
            },
        };

        let envelope: Envelope<InitData> = self
            .api
            .send_json(
                "upload init",
                self.api
                    .http()
                    .post(format!("{}/post/publish/video/init/", self.base_url))
                    .bearer_auth(access_token)
                    .json(&body),
            )
            .await?;

        Ok(envelope.data)
    }

    async fn upload_chunks(
        &self,
        upload_url: &str,
        plan: &ChunkPlan,
        source: &Bytes,
    ) -> Result<(), PublicationError> {
        let ranges = plan.ranges();
        let total = ranges.len();

        for (index, (start, end)) in ranges.into_iter().enumerate() {
            debug!(chunk = index + 1, total, start, end, "uploading TikTok chunk");

            let chunk = source.slice(start as usize..=end as usize);
            self.api
                .send(
                    "chunk upload",
                    self.api
                        .http()
                        .put(upload_url)
                        .header(CONTENT_TYPE, "video/mp4")
                        .header(
                            CONTENT_RANGE,
                            format!("bytes {}-{}/{}", start, end, plan.video_size),
                        )
                        .body(chunk),
                )
                .await?;
        }

        Ok(())
    }

    async fn commit(&self, caption: &str, access_token: &str) -> Result<CommitData, PublicationError> {
        let body = CommitRequest {
            post_info: PostInfo::public(Some(caption)),
        };

        let envelope: Envelope<CommitData> = self
            .api
            .send_json(
                "publish commit",
                self.api
                    .http()
                    .post(format!("{}/post/publish/video/commit/", self.base_url))
                    .bearer_auth(access_token)
                    .json(&body),
            )
            .await?;

        Ok(envelope.data)
    }
}

#[async_trait]
impl PlatformPublisher for TikTokPublisher {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn platform_requirements(&self) -> PlatformRequirements {
        REQUIREMENTS
    }

    async fn validate_credentials(&self) -> Result<(), CredentialsError> {
        self.secrets.ensure_complete()?;
        let access_token = self.secrets.require(ACCESS_TOKEN)?;

        self.api
            .check_credentials(
                self.api
                    .http()
                    .get(format!("{}/user/info/", self.base_url))
                    .bearer_auth(access_token),
            )
            .await
    }

    async fn execute_protocol(
        &self,
        video: &PublishableVideo,
    ) -> Result<PublishedMedia, PublicationError> {
        let access_token = self.secrets.require(ACCESS_TOKEN)?;

        let source = self.api.fetch_source(&video.video_url).await?;
        let plan = ChunkPlan::for_size(source.len() as u64);

        let init = self.initialize_upload(&plan, access_token).await?;
        self.upload_chunks(&init.upload_url, &plan, &source).await?;

        let caption = prepare_caption(&video.record, Some(REQUIREMENTS.max_caption_length));
        let committed = self.commit(&caption, access_token).await?;

        Ok(PublishedMedia::published(
            Platform::TikTok,
            committed.publish_id.or(init.publish_id),
            committed.share_url.filter(|url| !url.is_empty()),
        ))
    }
}
