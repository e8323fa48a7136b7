//! Authenticated request client for MongoDB Stitch
//!
//! Composes the request model and transport from `transport` with the
//! session state from `stitch-auth` into `StitchClient`: every call attaches
//! the current bearer token, an invalid-session answer triggers one shared
//! session renewal, and the original call is replayed exactly once.
//!
//! Request lifecycle:
//! 1. Caller wraps a `Request` in an `AuthenticatedRequest`
//! 2. The client reads `AuthInfo` under the state lock and attaches the token
//! 3. Transport performs the round trip; non-2xx answers become `Error::Service`
//! 4. `InvalidSession` on a refreshable request joins (or starts) the single
//!    in-flight renewal, then retries once with the renewed token
//! 5. A failed renewal clears the session and surfaces `Error::RefreshFailed`

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
mod refresh;
pub mod request;
pub mod routes;
pub mod service_error;
mod session;
pub mod stream;

#[cfg(test)]
mod test_support;

pub use client::StitchClient;
pub use config::{ClientConfig, DeviceConfig, ProactiveRefreshConfig};
pub use error::{Error, Result};
pub use request::AuthenticatedRequest;
pub use routes::Routes;
pub use service_error::ServiceErrorCode;
pub use stream::ClientEventStream;

pub use stitch_auth::{
    AuthEvent, AuthInfo, AuthListener, Credential, LogoutReason, OAuth2Credential, ProviderType,
    Subscription, UserProfile,
};
pub use transport::{Method, Request, RequestBuilder, Response, json_body};
