pub mod video_validator;

pub use video_validator::VideoValidator;
