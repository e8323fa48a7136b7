//! Error types for request building and transport round trips

/// Errors from the transport layer.
///
/// These never carry a server response: anything the server answered with,
/// including error statuses, is a `Response`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("event stream failed: {0}")]
    Stream(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors from building a `Request`. Raised locally, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestBuildError {
    #[error("request path is missing")]
    MissingPath,

    #[error("request method is missing")]
    MissingMethod,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("a request sent with the refresh token cannot refresh on failure")]
    RefreshTokenCannotRefresh,
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;
