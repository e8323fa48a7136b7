//! Immutable request values and their builder
//!
//! A `Request` is only ever produced by `RequestBuilder::build`, which
//! validates that a path and method are present. Header and body problems
//! are recorded while building and reported from `build`, so a chain of
//! builder calls never needs intermediate `?`.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::error::RequestBuildError;

/// A fully described HTTP request, relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct Request {
    path: String,
    method: Method,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl Request {
    /// Start building a request.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Copy of this request with `name` set to `value`, replacing any
    /// existing values for that header.
    pub fn with_header(&self, name: HeaderName, value: HeaderValue) -> Request {
        let mut request = self.clone();
        request.headers.insert(name, value);
        request
    }

    /// Copy of this request with `timeout` applied if it has none of its own.
    pub fn with_default_timeout(&self, timeout: Duration) -> Request {
        let mut request = self.clone();
        request.timeout.get_or_insert(timeout);
        request
    }
}

/// Builder for `Request`. `path` and `method` are required.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    path: Option<String>,
    method: Option<Method>,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
    error: Option<RequestBuildError>,
}

impl RequestBuilder {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Append a header value. Repeated names keep every value.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let parsed = match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => Ok((name, value)),
            (Err(e), _) => Err(RequestBuildError::InvalidHeader(format!("{name}: {e}"))),
            (_, Err(e)) => Err(RequestBuildError::InvalidHeader(format!("{name}: {e}"))),
        };
        match parsed {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate and produce the immutable request.
    ///
    /// Fails with `MissingPath` for an absent or empty path, `MissingMethod`
    /// when no method was set, or the first header/body error recorded.
    pub fn build(self) -> Result<Request, RequestBuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let path = self
            .path
            .filter(|p| !p.is_empty())
            .ok_or(RequestBuildError::MissingPath)?;
        let method = self.method.ok_or(RequestBuildError::MissingMethod)?;
        Ok(Request {
            path,
            method,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
        })
    }
}

/// Layer a JSON document body onto a builder, setting `Content-Type`.
///
/// A value that fails to serialize is recorded as `InvalidBody` and
/// surfaces from `build`.
pub fn json_body<T: Serialize + ?Sized>(builder: RequestBuilder, document: &T) -> RequestBuilder {
    match serde_json::to_vec(document) {
        Ok(bytes) => {
            let mut builder = builder.body(bytes);
            builder
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            builder
        }
        Err(e) => {
            let mut builder = builder;
            builder
                .error
                .get_or_insert(RequestBuildError::InvalidBody(e.to_string()));
            builder
        }
    }
}
