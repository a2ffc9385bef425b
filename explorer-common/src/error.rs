//! Common error types for the checkpoint explorer

use thiserror::Error;

/// Common result type for explorer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across explorer front-ends
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration document could not be parsed
    #[error("Configuration parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error means no usable configuration could be assembled.
    ///
    /// The UI treats these as blocking: without an API base URL nothing can be fetched.
    pub fn is_config_unavailable(&self) -> bool {
        matches!(self, Error::Config(_) | Error::TomlParse(_) | Error::Io(_))
    }
}
