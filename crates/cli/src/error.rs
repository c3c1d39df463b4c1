//! Error types for tracksidectl

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot decode frame: {0}")]
    DecodeError(String),

    #[error("Reader failed: {0}")]
    ReaderFailed(String),

    #[error("Config error: {0}")]
    ConfigError(#[from] trackside_config::ConfigError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidConfiguration(_) | CliError::ConfigError(_) => 4,
            CliError::DecodeError(_) | CliError::JsonError(_) => 3,
            CliError::ReaderFailed(_) => 5,
        }
    }
}
