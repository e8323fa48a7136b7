//! Error types for authenticated client operations

use std::sync::Arc;

use transport::RequestBuildError;

use crate::service_error::ServiceErrorCode;

/// Errors from client operations.
///
/// `Service` is a well-formed answer from the server; `Transport` means no
/// answer arrived. `Decoding` is a success response the client could not
/// read. `RefreshFailed` wraps the renewal failure that ended the session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    RequestBuild(#[from] RequestBuildError),

    #[error("transport error: {0}")]
    Transport(#[from] transport::Error),

    #[error("service error ({code}): {message}")]
    Service {
        code: ServiceErrorCode,
        message: String,
    },

    #[error("failed to decode response: {0}")]
    Decoding(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("session refresh failed: {0}")]
    RefreshFailed(Arc<Error>),

    #[error("session state error: {0}")]
    Storage(#[from] stitch_auth::Error),

    #[error(transparent)]
    Config(#[from] common::Error),

    #[error("background task ended early: {0}")]
    Aborted(String),
}

impl Error {
    /// Whether the server rejected the access token as no longer valid.
    pub fn is_invalid_session(&self) -> bool {
        matches!(
            self,
            Error::Service {
                code: ServiceErrorCode::InvalidSession,
                ..
            }
        )
    }

    /// Service error code, if the server answered with one.
    pub fn service_code(&self) -> Option<&ServiceErrorCode> {
        match self {
            Error::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Metric label for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::RequestBuild(_) => "request_build",
            Error::Transport(_) => "transport",
            Error::Service { .. } => "service",
            Error::Decoding(_) => "decoding",
            Error::NotAuthenticated => "not_authenticated",
            Error::RefreshFailed(_) => "refresh_failed",
            Error::Storage(_) => "storage",
            Error::Config(_) => "config",
            Error::Aborted(_) => "aborted",
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
