//! Facebook Plugin - Page video upload through the Graph API

use crate::core::error::{CredentialsError, PublicationError};
use crate::core::traits::{
    Platform, PlatformPublisher, PlatformRequirements, PublishableVideo, PublishedMedia,
};
use crate::platforms::caption::prepare_caption;
use crate::platforms::http::{ApiClient, string_or_number};
use crate::security::PlatformSecrets;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

pub const ACCESS_TOKEN: &str = "FACEBOOK_ACCESS_TOKEN";
pub const PAGE_ID: &str = "FACEBOOK_PAGE_ID";

pub const REQUIREMENTS: PlatformRequirements = PlatformRequirements {
    max_file_size_mb: 1024,
    max_duration_seconds: 240,
    supported_formats: &["mp4", "mov", "avi"],
    max_caption_length: 63206,
};

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

/// Facebook page publisher
pub struct FacebookPublisher {
    api: ApiClient,
    base_url: String,
    secrets: PlatformSecrets,
}

impl FacebookPublisher {
    pub fn new(http: Client, base_url: impl Into<String>, secrets: PlatformSecrets) -> Self {
        Self {
            api: ApiClient::new(http, Platform::Facebook, secrets.masker()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secrets,
        }
    }
}

#[async_trait]
impl PlatformPublisher for FacebookPublisher {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    fn platform_requirements(&self) -> PlatformRequirements {
        REQUIREMENTS
    }

    async fn validate_credentials(&self) -> Result<(), CredentialsError> {
        let access_token = self.secrets.require(ACCESS_TOKEN)?;
        let page_id = self.secrets.require(PAGE_ID)?;

        self.api
            .check_credentials(
                self.api
                    .http()
                    .get(format!("{}/{}", self.base_url, page_id))
                    .query(&[("access_token", access_token)]),
            )
            .await
    }

    async fn execute_protocol(
        &self,
        video: &PublishableVideo,
    ) -> Result<PublishedMedia, PublicationError> {
        let access_token = self.secrets.require(ACCESS_TOKEN)?;
        let page_id = self.secrets.require(PAGE_ID)?;

        let source = self.api.fetch_source(&video.video_url).await?;
        let description = prepare_caption(&video.record, Some(REQUIREMENTS.max_caption_length));

        let part = Part::bytes(source.to_vec())
            .file_name("video.mp4")
            .mime_str("video/mp4")
            .map_err(|e| self.api.invalid_response("video upload", e.to_string()))?;
        let form = Form::new()
            .text("description", description)
            .text("access_token", access_token.to_string())
            .text("published", "true")
            .part("source", part);

        let uploaded: UploadedVideo = self
            .api
            .send_json(
                "video upload",
                self.api
                    .http()
                    .post(format!("{}/{}/videos", self.base_url, page_id))
                    .multipart(form),
            )
            .await?;

        let url = format!("https://www.facebook.com/{}", uploaded.id);
        Ok(PublishedMedia::published(
            Platform::Facebook,
            Some(uploaded.id),
            Some(url),
        ))
    }
}
