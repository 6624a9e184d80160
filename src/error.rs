//! Error types for Mnemo

use thiserror::Error;

/// Result type alias using Mnemo's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Mnemo
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hosted LLM API error
    #[error("Provider API error: {0}")]
    Provider(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Qdrant error
    #[error("Qdrant error: {0}")]
    Qdrant(String),

    /// Embedding generation error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Reset requested without the opt-in flag set in configuration
    #[error("Reset is disabled: set storage.qdrant.allow_reset = true to enable")]
    ResetDisabled,

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::Qdrant(_)
                | Error::RateLimit(_)
                | Error::Timeout(_)
                | Error::Database(_)
        )
    }

    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::NotFound(_)
                | Error::Unauthorized(_)
                | Error::ResetDisabled
        )
    }
}

impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::Qdrant(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_disabled_is_client_error() {
        assert!(Error::ResetDisabled.is_client_error());
        assert!(!Error::ResetDisabled.is_retryable());
    }

    #[test]
    fn test_rate_limit_is_retryable() {
        assert!(Error::RateLimit("slow down".into()).is_retryable());
    }
}
