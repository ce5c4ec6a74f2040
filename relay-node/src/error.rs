use thiserror::Error;

/// Errors that can occur in the relay node library
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Platform API error
    #[error("Platform API error: {0}")]
    Api(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Dispatch error
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Api(err.to_string())
    }
}
