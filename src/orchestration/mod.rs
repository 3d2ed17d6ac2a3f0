//! Orchestration layer for video publication
//!
//! This module provides the publication service that fans a stored video out
//! to several platforms, the ingest service that stores new videos, plus the
//! result and audit types they produce.

pub mod ingest_service;
pub mod publication_service;
pub mod report;

// Re-export main types for convenience
pub use ingest_service::{UploadRequest, UploadedVideo, VideoIngestService};
pub use publication_service::{PublicationOptions, PublicationService};
pub use report::{
    AggregateResult, OverallStatus, PublicationAttemptResult, PublicationRecord,
    PublicationStatus, PublicationStatusReport,
};
