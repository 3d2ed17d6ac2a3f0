pub mod core;
pub mod orchestration;
pub mod platforms;
pub mod security;
pub mod storage;
pub mod validation;

pub use crate::core::*;
pub use orchestration::{
    AggregateResult, PublicationOptions, PublicationService, UploadRequest, VideoIngestService,
};
pub use platforms::PublisherRegistry;
pub use security::{CredentialStore, EnvCredentialStore};
pub use storage::{ObjectStore, VideoRepository};
pub use validation::VideoValidator;
