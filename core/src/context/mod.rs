mod config;
mod error;

pub use config::{APP_NAME, EngineConfigExt, data_dir};
pub use error::ConfigError;
