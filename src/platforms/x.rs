//! X Plugin - chunked media upload and tweet creation
//!
//! Requests are signed with OAuth 1.0a user context. Video upload uses the
//! v1.1 media endpoint (INIT, APPEND, FINALIZE, then STATUS while the
//! upload is processed) and the tweet is created through API v2.

use crate::core::error::{CredentialsError, PublicationError};
use crate::core::polling::{PollOptions, PollOutcome, PollStatus, Poller};
use crate::core::traits::{
    Platform, PlatformPublisher, PlatformRequirements, PublishableVideo, PublishedMedia,
};
use crate::platforms::caption::prepare_caption;
use crate::platforms::http::{ApiClient, string_or_number};
use crate::platforms::oauth1::OAuth1Signer;
use crate::security::PlatformSecrets;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const API_KEY: &str = "X_API_KEY";
pub const API_SECRET: &str = "X_API_SECRET";
pub const ACCESS_TOKEN: &str = "X_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET: &str = "X_ACCESS_TOKEN_SECRET";

pub const REQUIREMENTS: PlatformRequirements = PlatformRequirements {
    max_file_size_mb: 512,
    max_duration_seconds: 140,
    supported_formats: &["mp4", "mov"],
    max_caption_length: 280,
};

/// APPEND segment size
pub const SEGMENT_SIZE: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: Option<String>,
    media_id: Option<u64>,
    processing_info: Option<ProcessingInfo>,
}

impl MediaUploadResponse {
    fn id(&self) -> Option<String> {
        self.media_id_string
            .clone()
            .or_else(|| self.media_id.map(|id| id.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ProcessingInfo {
    state: String,
}

#[derive(Debug, Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
    media: TweetMedia<'a>,
}

#[derive(Debug, Serialize)]
struct TweetMedia<'a> {
    media_ids: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

/// X publisher
pub struct XPublisher {
    api: ApiClient,
    api_base: String,
    upload_base: String,
    secrets: PlatformSecrets,
    polling: PollOptions,
}

impl XPublisher {
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
        secrets: PlatformSecrets,
        polling: PollOptions,
    ) -> Self {
        Self {
            api: ApiClient::new(http, Platform::X, secrets.masker()),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            secrets,
            polling,
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/media/upload.json", self.upload_base)
    }

    /// Sign a request; `params` must match the form body exactly
    fn authorize(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, CredentialsError> {
        let signer = OAuth1Signer {
            consumer_key: self.secrets.require(API_KEY)?,
            consumer_secret: self.secrets.require(API_SECRET)?,
            token: self.secrets.require(ACCESS_TOKEN)?,
            token_secret: self.secrets.require(ACCESS_TOKEN_SECRET)?,
        };

        signer
            .authorization_header(method, url, params)
            .map_err(|e| CredentialsError::Invalid {
                platform: Platform::X,
                message: e.to_string(),
            })
    }

    /// Send a signed form-encoded command to the upload endpoint
    async fn upload_command(
        &self,
        step: &'static str,
        params: &[(&str, &str)],
    ) -> Result<MediaUploadResponse, PublicationError> {
        let url = self.upload_url();
        let authorization = self.authorize("POST", &url, params)?;

        self.api
            .send_json(
                step,
                self.api
                    .http()
                    .post(&url)
                    .header(AUTHORIZATION, authorization)
                    .form(params),
            )
            .await
    }

    async fn init_upload(&self, total_bytes: usize) -> Result<MediaUploadResponse, PublicationError> {
        let total_bytes = total_bytes.to_string();
        self.upload_command(
            "media upload INIT",
            &[
                ("command", "INIT"),
                ("media_type", "video/mp4"),
                ("total_bytes", total_bytes.as_str()),
                ("media_category", "tweet_video"),
            ],
        )
        .await
    }

    async fn append_segments(&self, media_id: &str, source: &Bytes) -> Result<(), PublicationError> {
        let url = self.upload_url();
        let total = source.len().div_ceil(SEGMENT_SIZE);

        for (segment_index, chunk) in source.chunks(SEGMENT_SIZE).enumerate() {
            debug!(segment = segment_index + 1, total, bytes = chunk.len(), "appending X media segment");

            // Multipart bodies are not part of the OAuth signature.
            let authorization = self.authorize("POST", &url, &[])?;
            let form = Form::new()
                .text("command", "APPEND")
                .text("media_id", media_id.to_string())
                .text("segment_index", segment_index.to_string())
                .part("media", Part::bytes(chunk.to_vec()));

            self.api
                .send(
                    "media upload APPEND",
                    self.api
                        .http()
                        .post(&url)
                        .header(AUTHORIZATION, authorization)
                        .multipart(form),
                )
                .await?;
        }

        Ok(())
    }

    async fn media_status(&self, media_id: &str) -> Result<PollStatus<()>, PublicationError> {
        let url = format!("{}?command=STATUS&media_id={}", self.upload_url(), media_id);
        let authorization = self.authorize("GET", &url, &[])?;

        let status: MediaUploadResponse = self
            .api
            .send_json(
                "media upload STATUS",
                self.api.http().get(&url).header(AUTHORIZATION, authorization),
            )
            .await?;

        match status.processing_info.as_ref().map(|info| info.state.as_str()) {
            None | Some("succeeded") => Ok(PollStatus::Ready(())),
            Some("failed") => Err(PublicationError::MediaProcessingFailed {
                platform: Platform::X,
            }),
            Some(state) => {
                debug!(media_id, state, "X media still processing");
                Ok(PollStatus::Pending)
            }
        }
    }

    async fn wait_for_processing(&self, media_id: &str) -> Result<(), PublicationError> {
        let outcome = Poller::new(self.polling)
            .poll(move || async move { self.media_status(media_id).await })
            .await?;

        match outcome {
            PollOutcome::Ready(()) => Ok(()),
            PollOutcome::Exhausted { attempts } => Err(PublicationError::MediaProcessingTimeout {
                platform: Platform::X,
                attempts,
            }),
        }
    }

    async fn create_tweet(&self, text: &str, media_id: &str) -> Result<String, PublicationError> {
        let url = format!("{}/tweets", self.api_base);
        let authorization = self.authorize("POST", &url, &[])?;
        let body = TweetRequest {
            text,
            media: TweetMedia {
                media_ids: [media_id],
            },
        };

        let created: TweetResponse = self
            .api
            .send_json(
                "tweet creation",
                self.api
                    .http()
                    .post(&url)
                    .header(AUTHORIZATION, authorization)
                    .json(&body),
            )
            .await?;

        Ok(created.data.id)
    }
}

#[async_trait]
impl PlatformPublisher for XPublisher {
    fn platform(&self) -> Platform {
        Platform::X
    }

    fn platform_requirements(&self) -> PlatformRequirements {
        REQUIREMENTS
    }

    async fn validate_credentials(&self) -> Result<(), CredentialsError> {
        self.secrets.ensure_complete()?;

        let url = format!("{}/users/me", self.api_base);
        let authorization = self.authorize("GET", &url, &[])?;

        self.api
            .check_credentials(self.api.http().get(&url).header(AUTHORIZATION, authorization))
            .await
    }

    async fn execute_protocol(
        &self,
        video: &PublishableVideo,
    ) -> Result<PublishedMedia, PublicationError> {
        let source = self.api.fetch_source(&video.video_url).await?;

        let init = self.init_upload(source.len()).await?;
        let media_id = init
            .id()
            .ok_or_else(|| self.api.invalid_response("media upload INIT", "missing media_id"))?;

        self.append_segments(&media_id, &source).await?;

        let finalized = self
            .upload_command(
                "media upload FINALIZE",
                &[("command", "FINALIZE"), ("media_id", media_id.as_str())],
            )
            .await?;

        let processing = finalized
            .processing_info
            .as_ref()
            .is_some_and(|info| info.state != "succeeded");
        if processing {
            self.wait_for_processing(&media_id).await?;
        }

        let text = prepare_caption(&video.record, Some(REQUIREMENTS.max_caption_length));
        let tweet_id = self.create_tweet(&text, &media_id).await?;

        let url = format!("https://x.com/user/status/{}", tweet_id);
        Ok(PublishedMedia::published(Platform::X, Some(tweet_id), Some(url)))
    }
}
