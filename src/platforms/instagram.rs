//! Instagram Plugin - Reels publishing through the Graph API
//!
//! Publishing is a three step protocol:
//! 1. create a REELS media container from the video URL
//! 2. poll the container until processing finishes
//! 3. publish the container

use crate::core::error::{CredentialsError, PublicationError};
use crate::core::polling::{PollOptions, PollOutcome, PollStatus, Poller};
use crate::core::traits::{
    Platform, PlatformPublisher, PlatformRequirements, PublishableVideo, PublishedMedia,
};
use crate::platforms::caption::prepare_caption;
use crate::platforms::http::{ApiClient, string_or_number};
use crate::security::PlatformSecrets;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const ACCESS_TOKEN: &str = "INSTAGRAM_ACCESS_TOKEN";
pub const BUSINESS_ACCOUNT_ID: &str = "INSTAGRAM_BUSINESS_ACCOUNT_ID";

pub const REQUIREMENTS: PlatformRequirements = PlatformRequirements {
    max_file_size_mb: 100,
    max_duration_seconds: 60,
    supported_formats: &["mp4", "mov"],
    max_caption_length: 2200,
};

#[derive(Debug, Deserialize)]
struct CreatedObject {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    status_code: Option<String>,
}

/// Instagram publisher
pub struct InstagramPublisher {
    api: ApiClient,
    base_url: String,
    secrets: PlatformSecrets,
    polling: PollOptions,
}

impl InstagramPublisher {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        secrets: PlatformSecrets,
        polling: PollOptions,
    ) -> Self {
        Self {
            api: ApiClient::new(http, Platform::Instagram, secrets.masker()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secrets,
            polling,
        }
    }

    async fn create_container(
        &self,
        video: &PublishableVideo,
        account_id: &str,
        access_token: &str,
    ) -> Result<String, PublicationError> {
        let caption = prepare_caption(&video.record, Some(REQUIREMENTS.max_caption_length));
        let form = [
            ("video_url", video.video_url.as_str()),
            ("media_type", "REELS"),
            ("caption", caption.as_str()),
            ("access_token", access_token),
        ];

        let created: CreatedObject = self
            .api
            .send_json(
                "media container creation",
                self.api
                    .http()
                    .post(format!("{}/{}/media", self.base_url, account_id))
                    .form(&form),
            )
            .await?;

        debug!(container_id = %created.id, "created Instagram media container");
        Ok(created.id)
    }

    /// Poll the container until it is `FINISHED`
    async fn wait_for_container(
        &self,
        container_id: &str,
        access_token: &str,
    ) -> Result<(), PublicationError> {
        let api = &self.api;
        let status_url = format!("{}/{}", self.base_url, container_id);
        let status_url = status_url.as_str();

        let outcome = Poller::new(self.polling)
            .poll(move || async move {
                let status: ContainerStatus = api
                    .send_json(
                        "container status",
                        api.http()
                            .get(status_url)
                            .query(&[("fields", "status_code"), ("access_token", access_token)]),
                    )
                    .await?;

                match status.status_code.as_deref() {
                    Some("FINISHED") => Ok(PollStatus::Ready(())),
                    Some("ERROR") => Err(PublicationError::MediaProcessingFailed {
                        platform: Platform::Instagram,
                    }),
                    other => {
                        debug!(container_id, status = other.unwrap_or("-"), "container not ready");
                        Ok(PollStatus::Pending)
                    }
                }
            })
            .await?;

        match outcome {
            PollOutcome::Ready(()) => Ok(()),
            PollOutcome::Exhausted { attempts } => Err(PublicationError::MediaProcessingTimeout {
                platform: Platform::Instagram,
                attempts,
            }),
        }
    }

    async fn publish_container(
        &self,
        container_id: &str,
        account_id: &str,
        access_token: &str,
    ) -> Result<String, PublicationError> {
        let published: CreatedObject = self
            .api
            .send_json(
                "media publish",
                self.api
                    .http()
                    .post(format!("{}/{}/media_publish", self.base_url, account_id))
                    .form(&[("creation_id", container_id), ("access_token", access_token)]),
            )
            .await?;

        Ok(published.id)
    }
}

#[async_trait]
impl PlatformPublisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn platform_requirements(&self) -> PlatformRequirements {
        REQUIREMENTS
    }

    async fn validate_credentials(&self) -> Result<(), CredentialsError> {
        let access_token = self.secrets.require(ACCESS_TOKEN)?;
        let account_id = self.secrets.require(BUSINESS_ACCOUNT_ID)?;

        self.api
            .check_credentials(
                self.api
                    .http()
                    .get(format!("{}/{}", self.base_url, account_id))
                    .query(&[("access_token", access_token)]),
            )
            .await
    }

    async fn execute_protocol(
        &self,
        video: &PublishableVideo,
    ) -> Result<PublishedMedia, PublicationError> {
        let access_token = self.secrets.require(ACCESS_TOKEN)?;
        let account_id = self.secrets.require(BUSINESS_ACCOUNT_ID)?;

        let container_id = self.create_container(video, account_id, access_token).await?;
        self.wait_for_container(&container_id, access_token).await?;
        let media_id = self
            .publish_container(&container_id, account_id, access_token)
            .await?;

        let url = format!("https://www.instagram.com/p/{}/", media_id);
        Ok(PublishedMedia::published(
            Platform::Instagram,
            Some(media_id),
            Some(url),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::fixtures::publishable_video;
    use crate::orchestration::PublicationRecord;
    use crate::security::EnvCredentialStore;
    use std::collections::HashMap;

    fn publisher(vars: &[(&str, &str)]) -> InstagramPublisher {
        let store = EnvCredentialStore::from_vars(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        );
        InstagramPublisher::new(
            Client::new(),
            "https://graph.example.test/v18.0/",
            PlatformSecrets::from_store(Platform::Instagram, &store),
            PollOptions::default(),
        )
    }

    #[test]
    fn test_requirements_are_stable() {
        let publisher = publisher(&[]);
        assert_eq!(publisher.platform_requirements(), publisher.platform_requirements());
        assert_eq!(publisher.platform_requirements().max_caption_length, 2200);
        assert_eq!(publisher.base_url, "https://graph.example.test/v18.0");
    }

    #[tokio::test]
    async fn test_missing_account_id() {
        let publisher = publisher(&[(ACCESS_TOKEN, "IGQV-token")]);

        let err = publisher.validate_credentials().await.unwrap_err();

        assert_eq!(
            err,
            CredentialsError::Missing {
                platform: Platform::Instagram,
                field: BUSINESS_ACCOUNT_ID,
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_graph_api_does_not_leak_token() {
        let token = "IGQVSUPERSECRETTOKEN123";
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let store = EnvCredentialStore::from_vars(HashMap::from([
            (ACCESS_TOKEN.to_string(), token.to_string()),
            (BUSINESS_ACCOUNT_ID.to_string(), "1784".to_string()),
        ]));
        let publisher = InstagramPublisher::new(
            Client::new(),
            format!("http://127.0.0.1:{}/v18.0", port),
            PlatformSecrets::from_store(Platform::Instagram, &store),
            PollOptions::default(),
        );

        let err = publisher.publish(&publishable_video()).await.unwrap_err();
        assert_eq!(err.code(), "CREDENTIALS_INVALID");
        assert!(!err.to_string().contains(token));

        let record = PublicationRecord::failure(42, &err);
        assert!(!record.publication_data.to_string().contains(token));
    }
}
