//! Request model and HTTP transport abstraction for the Stitch client
//!
//! Defines the immutable `Request` value built through `RequestBuilder`, the
//! `Response` returned by a round trip, and the `Transport` trait that
//! decouples request execution from the HTTP stack. `ReqwestTransport` is the
//! production implementation; tests substitute scripted transports.

pub mod error;
pub mod request;
pub mod reqwest_transport;
pub mod response;
pub mod sse;

pub use error::{Error, RequestBuildError, Result};
pub use request::{Request, RequestBuilder, json_body};
pub use reqwest_transport::ReqwestTransport;
pub use response::Response;
pub use sse::{Event, EventDecoder, EventStream, StreamResponse};

pub use reqwest::Method;
pub use reqwest::StatusCode;
pub use reqwest::header;

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by `Transport` methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A single HTTP round trip, plus an optional server-sent-event stream.
///
/// Implementations apply `Request::timeout` to the round trip and report
/// connection failures and timeouts as `Error`. Non-2xx responses are *not*
/// errors at this layer: they come back as a `Response` for the caller to
/// classify.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// Perform one request and buffer the full response body.
    fn round_trip<'a>(&'a self, request: &'a Request) -> TransportFuture<'a, Response>;

    /// Open a server-sent-event stream.
    ///
    /// A non-success status is returned as `StreamResponse::Rejected` with the
    /// buffered error body. Transports without streaming support keep the
    /// default, which fails with `Error::Stream`.
    fn open_stream<'a>(&'a self, request: &'a Request) -> TransportFuture<'a, StreamResponse> {
        let path = request.path().to_owned();
        Box::pin(async move {
            Err(Error::Stream(format!(
                "transport does not support event streams ({path})"
            )))
        })
    }
}
