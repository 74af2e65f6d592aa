//! Shared configuration and platform vocabulary for trendscout.

pub mod app_config;
pub mod config;
pub mod platform;
pub mod platforms;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use platform::Platform;
pub use platforms::{
    load_platforms, parse_platforms, PlatformConfig, PlatformsFile, DEFAULT_ITEMS_PER_PLATFORM,
    MAX_ITEMS_PER_PLATFORM,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read platforms file {path}: {source}")]
    PlatformsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse platforms file: {0}")]
    PlatformsFileParse(#[from] serde_yaml::Error),

    #[error("invalid platform tag \"{0}\"")]
    InvalidPlatform(String),

    #[error("platforms validation error: {0}")]
    Validation(String),
}
