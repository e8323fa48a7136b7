//! Error types for session state operations

/// Errors from session state, persistence and token decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("missing field: {0}")]
    MissingField(String),
}

/// Result alias for session state operations.
pub type Result<T> = std::result::Result<T, Error>;
