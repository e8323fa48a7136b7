//! Buffered HTTP responses

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

/// Status, headers and fully buffered body of one round trip.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Whether the server accepted the request (2xx or 3xx).
    pub fn is_success(&self) -> bool {
        is_accepted(self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 2xx and 3xx statuses count as success for calls and streams alike.
pub(crate) fn is_accepted(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_covers_2xx_and_3xx() {
        assert!(Response::new(StatusCode::OK, "").is_success());
        assert!(Response::new(StatusCode::NO_CONTENT, "").is_success());
        assert!(Response::new(StatusCode::FOUND, "").is_success());
        assert!(!Response::new(StatusCode::UNAUTHORIZED, "").is_success());
        assert!(!Response::new(StatusCode::INTERNAL_SERVER_ERROR, "").is_success());
    }

    #[test]
    fn json_decodes_body() {
        let response = Response::new(StatusCode::OK, r#"{"access_token":"A2"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["access_token"], "A2");
    }

    #[test]
    fn text_is_lossy() {
        let response = Response::new(StatusCode::OK, vec![b'o', b'k', 0xff]);
        assert_eq!(response.text(), "ok\u{fffd}");
    }
}
