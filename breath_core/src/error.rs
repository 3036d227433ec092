//! Error types for the breath_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for breath_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing the config file failed
    #[error("Config file I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Plan could not be rendered as JSON
    #[error("Plan serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file is not valid TOML for [`crate::Config`]
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config could not be written: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Config parsed but holds unusable values
    #[error("Configuration error: {0}")]
    Config(String),

    /// `start` was called with no Tokio runtime to drive the countdown
    #[error("No async runtime to run the session: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}
