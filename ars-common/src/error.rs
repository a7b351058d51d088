//! Common error types for ARS

use thiserror::Error;

/// Common result type for ARS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ARS services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Incoming event payload could not be turned into an Event
    #[error("Malformed event payload: {0}")]
    MalformedEvent(String),

    /// Outgoing payload could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
