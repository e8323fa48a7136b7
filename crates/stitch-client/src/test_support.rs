//! In-process test doubles for the client

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{StreamExt, stream};
use serde_json::Value;
use stitch_auth::{AuthInfo, ProviderType, UserProfile};
use transport::header::AUTHORIZATION;
use transport::{
    EventDecoder, Method, Request, Response, StatusCode, StreamResponse, Transport,
    TransportFuture,
};

type Handler = dyn Fn(&Request) -> transport::Result<Response> + Send + Sync;

/// A request as the transport saw it.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

/// Transport answering from a handler closure, recording every call.
///
/// The handler plays the server: it decides from path and bearer what to
/// answer. Per-path delays hold the answer back so concurrent callers can
/// pile up behind a slow call. Streams answer with the handler's response;
/// a success body is decoded as server-sent events.
pub(crate) struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&Request) -> transport::Result<Response> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
        })
    }

    /// Delay every answer for `path`.
    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(path.to_owned(), delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }

    /// Bearer tokens sent to `path`, in order.
    pub fn bearers_for(&self, path: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == path)
            .filter_map(|c| c.bearer)
            .collect()
    }

    async fn answer(&self, request: &Request) -> transport::Result<Response> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method().clone(),
            path: request.path().to_owned(),
            bearer: bearer_of(request),
            body: request.body().and_then(|b| serde_json::from_slice(b).ok()),
        });
        let delay = self.delays.lock().unwrap().get(request.path()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(request)
    }
}

impl Transport for ScriptedTransport {
    fn round_trip<'a>(&'a self, request: &'a Request) -> TransportFuture<'a, Response> {
        Box::pin(self.answer(request))
    }

    fn open_stream<'a>(&'a self, request: &'a Request) -> TransportFuture<'a, StreamResponse> {
        Box::pin(async move {
            let response = self.answer(request).await?;
            if !response.is_success() {
                return Ok(StreamResponse::Rejected(response));
            }
            let events = EventDecoder::new().push(&response.body);
            Ok(StreamResponse::Open(
                stream::iter(events.into_iter().map(Ok::<_, transport::Error>)).boxed(),
            ))
        })
    }
}

/// Bearer token of a prepared request.
pub(crate) fn bearer_of(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

pub(crate) fn ok_json(body: Value) -> Response {
    Response::new(StatusCode::OK, body.to_string())
}

pub(crate) fn error_envelope(status: StatusCode, code: &str, message: &str) -> Response {
    Response::new(
        status,
        serde_json::json!({ "error": message, "error_code": code }).to_string(),
    )
}

pub(crate) fn invalid_session() -> Response {
    error_envelope(StatusCode::UNAUTHORIZED, "InvalidSession", "invalid session")
}

pub(crate) fn sample_info(access: &str, refresh: Option<&str>) -> AuthInfo {
    AuthInfo {
        user_id: "user-1".into(),
        device_id: Some("device-1".into()),
        access_token: access.into(),
        refresh_token: refresh.map(Into::into),
        logged_in_provider_type: ProviderType::LocalUserPass,
        logged_in_provider_name: "local-userpass".into(),
        user_profile: UserProfile::default(),
    }
}

/// Unsigned JWT with the given expiry.
pub(crate) fn jwt_expiring_at(exp: u64) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#))
    )
}
