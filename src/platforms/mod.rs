pub mod caption;
pub mod facebook;
pub mod http;
pub mod instagram;
pub mod oauth1;
pub mod registry;
pub mod tiktok;
pub mod x;

pub use caption::prepare_caption;
pub use facebook::FacebookPublisher;
pub use instagram::InstagramPublisher;
pub use registry::PublisherRegistry;
pub use tiktok::TikTokPublisher;
pub use x::XPublisher;
