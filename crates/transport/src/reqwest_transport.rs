//! `Transport` implementation backed by `reqwest`.
//!
//! Joins each request path onto a fixed base URL, copies headers and body,
//! applies the per-request timeout, and maps reqwest failures onto the
//! transport error kinds (connect, timeout, other).

use futures_util::{StreamExt, TryStreamExt, stream};
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::{Response, is_accepted};
use crate::sse::{EventDecoder, StreamResponse};
use crate::{Transport, TransportFuture};

/// HTTP transport rooted at a base URL (scheme, host and optional prefix).
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest::Client`.
    ///
    /// The base URL must use an `http://` or `https://` scheme.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a transport sharing an existing client (connection pool, TLS config).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidUrl(format!(
                "base URL must start with http:// or https://, got: {base_url}"
            )));
        }
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &Request) -> String {
        let path = request.path();
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn prepare(&self, request: &Request) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method().clone(), self.url_for(request))
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }
        builder
    }

    async fn send(&self, request: &Request) -> Result<reqwest::Response> {
        debug!(method = %request.method(), path = request.path(), "sending request");
        self.prepare(request).send().await.map_err(map_error)
    }
}

impl Transport for ReqwestTransport {
    fn round_trip<'a>(&'a self, request: &'a Request) -> TransportFuture<'a, Response> {
        Box::pin(async move {
            let response = self.send(request).await?;
            buffer(response).await
        })
    }

    fn open_stream<'a>(&'a self, request: &'a Request) -> TransportFuture<'a, StreamResponse> {
        Box::pin(async move {
            let response = self.send(request).await?;
            if !is_accepted(response.status()) {
                return Ok(StreamResponse::Rejected(buffer(response).await?));
            }

            let mut decoder = EventDecoder::new();
            let events = response
                .bytes_stream()
                .map_err(|e| Error::Stream(e.to_string()))
                .map_ok(move |chunk| {
                    stream::iter(decoder.push(&chunk).into_iter().map(Ok::<_, Error>))
                })
                .try_flatten();
            Ok(StreamResponse::Open(events.boxed()))
        })
    }
}

async fn buffer(response: reqwest::Response) -> Result<Response> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(map_error)?;
    Ok(Response {
        status,
        headers,
        body,
    })
}

fn map_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else if e.is_connect() {
        Error::Connect(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
