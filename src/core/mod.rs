pub mod config;
pub mod config_loader;
pub mod error;
pub mod polling;
pub mod traits;

pub use config::*;
pub use config_loader::{ConfigLoadOptions, ConfigLoader, ConfigValidationResult};
pub use error::*;
pub use polling::*;
pub use traits::*;
