//! Publisher Registry - maps platform names to publisher instances
//!
//! # Example
//!
//! ```no_run
//! use video_publisher::core::ServiceConfig;
//! use video_publisher::platforms::PublisherRegistry;
//! use video_publisher::security::EnvCredentialStore;
//!
//! let registry = PublisherRegistry::from_config(
//!     &ServiceConfig::default(),
//!     &EnvCredentialStore::from_env(),
//!     reqwest::Client::new(),
//! );
//! assert!(registry.resolve("instagram").is_some());
//! assert!(registry.resolve("bluesky").is_none());
//! ```

use crate::core::config::ServiceConfig;
use crate::core::traits::{Platform, PlatformPublisher};
use crate::platforms::facebook::FacebookPublisher;
use crate::platforms::instagram::InstagramPublisher;
use crate::platforms::tiktok::TikTokPublisher;
use crate::platforms::x::XPublisher;
use crate::security::{CredentialStore, PlatformSecrets};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available platform publishers
#[derive(Default, Clone)]
pub struct PublisherRegistry {
    publishers: HashMap<Platform, Arc<dyn PlatformPublisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the four vendor publishers sharing one HTTP client
    pub fn from_config(config: &ServiceConfig, store: &dyn CredentialStore, http: Client) -> Self {
        let endpoints = &config.endpoints;
        let polling = config.polling.options();
        let secrets = |platform| PlatformSecrets::from_store(platform, store);

        let mut registry = Self::new();
        registry.register(Arc::new(InstagramPublisher::new(
            http.clone(),
            endpoints.instagram_graph.clone(),
            secrets(Platform::Instagram),
            polling,
        )));
        registry.register(Arc::new(TikTokPublisher::new(
            http.clone(),
            endpoints.tiktok_api.clone(),
            secrets(Platform::TikTok),
        )));
        registry.register(Arc::new(XPublisher::new(
            http.clone(),
            endpoints.x_api.clone(),
            endpoints.x_upload.clone(),
            secrets(Platform::X),
            polling,
        )));
        registry.register(Arc::new(FacebookPublisher::new(
            http,
            endpoints.facebook_graph.clone(),
            secrets(Platform::Facebook),
        )));
        registry
    }

    /// Add or replace the publisher for its platform
    pub fn register(&mut self, publisher: Arc<dyn PlatformPublisher>) {
        self.publishers.insert(publisher.platform(), publisher);
    }

    /// Look up a publisher by platform name, ignoring case
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn PlatformPublisher>> {
        let platform = name.parse::<Platform>().ok()?;
        self.publishers.get(&platform).cloned()
    }

    /// Registered platforms in canonical order
    pub fn available_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|platform| self.publishers.contains_key(platform))
            .collect()
    }
}
