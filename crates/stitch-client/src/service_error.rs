//! Classification of error responses from the Stitch server
//!
//! Failed calls answer with an envelope `{"error": "...", "error_code": "..."}`.
//! The code decides what the client does next: only `InvalidSession` may
//! trigger a session refresh, every other code is surfaced verbatim. Bodies
//! that are not an envelope (proxies, load balancers) are still reported as
//! service errors, carrying the status and raw body.

use std::fmt;

use serde::Deserialize;
use stitch_auth::INVALID_SESSION_CODE;
use transport::Response;

use crate::error::Error;

/// Platform error codes the client distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceErrorCode {
    MissingAuthReq,
    /// The access token is invalid or expired. Triggers session refresh.
    InvalidSession,
    UserAppDomainMismatch,
    DomainNotAllowed,
    ReadSizeLimitExceeded,
    InvalidParameter,
    MissingParameter,
    ArgumentsNotAllowed,
    FunctionExecutionError,
    NoMatchingRuleFound,
    InternalServerError,
    AuthProviderNotFound,
    AuthProviderAlreadyExists,
    ServiceNotFound,
    ServiceCommandNotFound,
    ValueNotFound,
    FunctionNotFound,
    FunctionSyntaxError,
    ExecutionTimeLimitExceeded,
    NotCallable,
    UserAlreadyConfirmed,
    UserNotFound,
    UserDisabled,
    /// A code this client does not know, or the HTTP status when the body
    /// was not an error envelope.
    Unknown(String),
}

impl ServiceErrorCode {
    /// Parse the `error_code` field of an error envelope.
    pub fn from_code(code: &str) -> Self {
        match code {
            "MissingAuthReq" => ServiceErrorCode::MissingAuthReq,
            INVALID_SESSION_CODE => ServiceErrorCode::InvalidSession,
            "UserAppDomainMismatch" => ServiceErrorCode::UserAppDomainMismatch,
            "DomainNotAllowed" => ServiceErrorCode::DomainNotAllowed,
            "ReadSizeLimitExceeded" => ServiceErrorCode::ReadSizeLimitExceeded,
            "InvalidParameter" => ServiceErrorCode::InvalidParameter,
            "MissingParameter" => ServiceErrorCode::MissingParameter,
            "ArgumentsNotAllowed" => ServiceErrorCode::ArgumentsNotAllowed,
            "FunctionExecutionError" => ServiceErrorCode::FunctionExecutionError,
            "NoMatchingRuleFound" => ServiceErrorCode::NoMatchingRuleFound,
            "InternalServerError" => ServiceErrorCode::InternalServerError,
            "AuthProviderNotFound" => ServiceErrorCode::AuthProviderNotFound,
            "AuthProviderAlreadyExists" => ServiceErrorCode::AuthProviderAlreadyExists,
            "ServiceNotFound" => ServiceErrorCode::ServiceNotFound,
            "ServiceCommandNotFound" => ServiceErrorCode::ServiceCommandNotFound,
            "ValueNotFound" => ServiceErrorCode::ValueNotFound,
            "FunctionNotFound" => ServiceErrorCode::FunctionNotFound,
            "FunctionSyntaxError" => ServiceErrorCode::FunctionSyntaxError,
            "ExecutionTimeLimitExceeded" => ServiceErrorCode::ExecutionTimeLimitExceeded,
            "NotCallable" => ServiceErrorCode::NotCallable,
            "UserAlreadyConfirmed" => ServiceErrorCode::UserAlreadyConfirmed,
            "UserNotFound" => ServiceErrorCode::UserNotFound,
            "UserDisabled" => ServiceErrorCode::UserDisabled,
            other => ServiceErrorCode::Unknown(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceErrorCode::MissingAuthReq => "MissingAuthReq",
            ServiceErrorCode::InvalidSession => INVALID_SESSION_CODE,
            ServiceErrorCode::UserAppDomainMismatch => "UserAppDomainMismatch",
            ServiceErrorCode::DomainNotAllowed => "DomainNotAllowed",
            ServiceErrorCode::ReadSizeLimitExceeded => "ReadSizeLimitExceeded",
            ServiceErrorCode::InvalidParameter => "InvalidParameter",
            ServiceErrorCode::MissingParameter => "MissingParameter",
            ServiceErrorCode::ArgumentsNotAllowed => "ArgumentsNotAllowed",
            ServiceErrorCode::FunctionExecutionError => "FunctionExecutionError",
            ServiceErrorCode::NoMatchingRuleFound => "NoMatchingRuleFound",
            ServiceErrorCode::InternalServerError => "InternalServerError",
            ServiceErrorCode::AuthProviderNotFound => "AuthProviderNotFound",
            ServiceErrorCode::AuthProviderAlreadyExists => "AuthProviderAlreadyExists",
            ServiceErrorCode::ServiceNotFound => "ServiceNotFound",
            ServiceErrorCode::ServiceCommandNotFound => "ServiceCommandNotFound",
            ServiceErrorCode::ValueNotFound => "ValueNotFound",
            ServiceErrorCode::FunctionNotFound => "FunctionNotFound",
            ServiceErrorCode::FunctionSyntaxError => "FunctionSyntaxError",
            ServiceErrorCode::ExecutionTimeLimitExceeded => "ExecutionTimeLimitExceeded",
            ServiceErrorCode::NotCallable => "NotCallable",
            ServiceErrorCode::UserAlreadyConfirmed => "UserAlreadyConfirmed",
            ServiceErrorCode::UserNotFound => "UserNotFound",
            ServiceErrorCode::UserDisabled => "UserDisabled",
            ServiceErrorCode::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ServiceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
    #[serde(default)]
    error_code: Option<String>,
}

/// Classify a non-success response.
pub fn classify_response(response: &Response) -> Error {
    match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => from_envelope(envelope),
        Err(_) => Error::Service {
            code: ServiceErrorCode::Unknown(response.status.as_str().to_owned()),
            message: format!("{}: {}", response.status, response.text()),
        },
    }
}

/// Classify the data of an `error` event on an event stream.
pub fn classify_event_data(data: &str) -> Error {
    match serde_json::from_str::<ErrorEnvelope>(data) {
        Ok(envelope) => from_envelope(envelope),
        Err(_) => Error::Service {
            code: ServiceErrorCode::Unknown(String::new()),
            message: data.to_owned(),
        },
    }
}

fn from_envelope(envelope: ErrorEnvelope) -> Error {
    let code = match envelope.error_code.as_deref() {
        Some(code) => ServiceErrorCode::from_code(code),
        None => ServiceErrorCode::Unknown(String::new()),
    };
    Error::Service {
        code,
        message: envelope.error,
    }
}
