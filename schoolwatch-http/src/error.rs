use thiserror::Error;

/// Errors raised while constructing a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}
