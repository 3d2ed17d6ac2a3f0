//! Shared HTTP plumbing for platform publishers
//!
//! Every vendor call goes through `ApiClient` so that transport failures,
//! non-2xx responses and malformed bodies map onto `PublicationError` the
//! same way for all platforms. Messages built from transport errors and vendor
//! bodies never carry the request URL and have the platform's secrets masked.

use crate::core::error::{CredentialsError, PublicationError};
use crate::core::traits::Platform;
use crate::security::SecretMasker;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Longest response body excerpt kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// Thin wrapper around a shared `reqwest::Client`, scoped to one platform
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    platform: Platform,
    masker: SecretMasker,
}

impl ApiClient {
    pub fn new(http: Client, platform: Platform, masker: SecretMasker) -> Self {
        Self {
            http,
            platform,
            masker,
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Send a request, failing on transport errors and non-2xx statuses
    pub async fn send(
        &self,
        step: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, PublicationError> {
        debug!(platform = %self.platform, step, "sending request");

        let response = request.send().await.map_err(|e| PublicationError::Network {
            platform: self.platform,
            step,
            message: self.transport_message(e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublicationError::Api {
                platform: self.platform,
                step,
                status: status.as_u16(),
                body: self.masker.mask(&excerpt(&body)),
            });
        }

        Ok(response)
    }

    /// Send a request and decode its JSON body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        step: &'static str,
        request: RequestBuilder,
    ) -> Result<T, PublicationError> {
        let response = self.send(step, request).await?;
        let text = response.text().await.map_err(|e| PublicationError::Network {
            platform: self.platform,
            step,
            message: self.transport_message(e),
        })?;

        serde_json::from_str(&text).map_err(|e| PublicationError::InvalidResponse {
            platform: self.platform,
            step,
            message: self.masker.mask(&format!("{} - body: {}", e, excerpt(&text))),
        })
    }

    /// Download the video bytes from its fetch URL
    pub async fn fetch_source(&self, video_url: &str) -> Result<Bytes, PublicationError> {
        let step = "video download";
        let response = self.send(step, self.http.get(video_url)).await?;

        let bytes = response.bytes().await.map_err(|e| PublicationError::Network {
            platform: self.platform,
            step,
            message: self.transport_message(e),
        })?;

        if bytes.is_empty() {
            return Err(PublicationError::InvalidResponse {
                platform: self.platform,
                step,
                message: "video source is empty".to_string(),
            });
        }

        debug!(platform = %self.platform, bytes = bytes.len(), "downloaded video source");
        Ok(bytes)
    }

    /// One authenticated probe; any failure means the credentials are unusable
    pub async fn check_credentials(&self, request: RequestBuilder) -> Result<(), CredentialsError> {
        let response = request.send().await.map_err(|e| CredentialsError::Invalid {
            platform: self.platform,
            message: self.transport_message(e),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(CredentialsError::Invalid {
            platform: self.platform,
            message: self
                .masker
                .mask(&format!("status {}: {}", status.as_u16(), excerpt(&body))),
        })
    }

    pub fn invalid_response(&self, step: &'static str, message: impl Into<String>) -> PublicationError {
        PublicationError::InvalidResponse {
            platform: self.platform,
            step,
            message: self.masker.mask(&message.into()),
        }
    }

    /// Query strings carry tokens for some vendors, so the URL is dropped
    fn transport_message(&self, error: reqwest::Error) -> String {
        self.masker.mask(&error.without_url().to_string())
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut short: String = body.chars().take(MAX_ERROR_BODY).collect();
    short.push_str("...");
    short
}

/// Vendor ids arrive as JSON strings or numbers depending on the endpoint
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
