//! Error types for logferry

use std::path::PathBuf;

/// logferry error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bad sink address: {0}")]
    AddressError(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Log source failed: {0}")]
    SourceError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for logferry
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn address<S: Into<String>>(msg: S) -> Self {
        Error::AddressError(msg.into())
    }

    pub fn source<S: Into<String>>(msg: S) -> Self {
        Error::SourceError(msg.into())
    }
}
