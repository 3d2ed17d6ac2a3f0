//! Storage ports and adapters
//!
//! The services only see the two ports; Postgres/S3 back the
//! binary, the in-memory adapters back tests and dry runs.

pub mod memory;
pub mod ports;
pub mod postgres;
pub mod s3;

pub use memory::{InMemoryObjectStore, InMemoryVideoRepository, StoredObject};
pub use ports::{ObjectStore, VideoRepository};
pub use postgres::PgVideoRepository;
pub use s3::S3ObjectStore;
