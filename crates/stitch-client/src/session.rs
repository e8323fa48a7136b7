//! Shared plumbing behind the client and the refresher
//!
//! Token selection, bearer attachment, response classification and the
//! login exchange live here so the request path and the renewal path
//! authenticate requests the same way.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use stitch_auth::{AuthInfo, AuthState, Credential, LoginResponse, SessionFields, UserProfile};
use tracing::debug;
use transport::header::{AUTHORIZATION, HeaderValue};
use transport::{Method, Request, RequestBuildError, Response, Transport, json_body};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::request::AuthenticatedRequest;
use crate::routes::Routes;
use crate::service_error::classify_response;

pub(crate) struct Session {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) state: Arc<AuthState>,
    pub(crate) routes: Routes,
    pub(crate) request_timeout: Duration,
    pub(crate) session_fields: SessionFields,
    pub(crate) device: DeviceConfig,
}

impl Session {
    /// Attach the token `request` selects from `info`.
    ///
    /// Returns the prepared request and the token it carries.
    pub(crate) fn authorize(
        request: &AuthenticatedRequest,
        info: Option<&AuthInfo>,
    ) -> Result<(Request, Secret<String>)> {
        let info = info.ok_or(Error::NotAuthenticated)?;
        let token = if request.use_refresh_token() {
            info.refresh_token.clone().ok_or(Error::NotAuthenticated)?
        } else {
            info.access_token.clone()
        };
        let prepared = with_bearer(request.request(), &token)?;
        Ok((prepared, token))
    }

    /// Authorize against the current session, atomically with reading it.
    pub(crate) async fn prepare(
        &self,
        request: &AuthenticatedRequest,
    ) -> Result<(Request, Secret<String>)> {
        self.state
            .with_current(|info| Self::authorize(request, info))
            .await
    }

    /// One round trip. Non-success answers become errors.
    pub(crate) async fn send(&self, request: &Request) -> Result<Response> {
        let request = request.with_default_timeout(self.request_timeout);
        let response = self.transport.round_trip(&request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(classify_response(&response))
        }
    }

    /// Login (or link) request for `credential`.
    pub(crate) fn login_request(
        &self,
        credential: &Credential,
        link: bool,
        device_id: Option<&str>,
    ) -> Result<Request> {
        let mut body = match credential.material() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert(
            "options".into(),
            json!({ "device": self.device_document(device_id) }),
        );
        let builder = Request::builder()
            .path(self.routes.login(credential.provider_name(), link))
            .method(Method::POST);
        Ok(json_body(builder, &body).build()?)
    }

    /// Exchange `credential` for a complete session.
    ///
    /// The profile is fetched with the new access token before anything is
    /// returned, so a caller never sees a session without one.
    pub(crate) async fn establish(&self, credential: &Credential) -> Result<AuthInfo> {
        let device_id = self.state.device_id().await;
        let request = self.login_request(credential, false, device_id.as_deref())?;
        let response = self.send(&request).await?;
        let login: LoginResponse = decode(&response)?;
        debug!(user_id = %login.user_id, provider = %credential.provider_type(), "login accepted");

        let user_profile = self.fetch_profile(&login.access_token).await?;
        Ok(AuthInfo {
            user_id: login.user_id,
            device_id: login.device_id.or(device_id),
            access_token: login.access_token,
            refresh_token: login.refresh_token,
            logged_in_provider_type: credential.provider_type(),
            logged_in_provider_name: credential.provider_name().to_owned(),
            user_profile,
        })
    }

    /// Profile of the user `access_token` belongs to.
    pub(crate) async fn fetch_profile(&self, access_token: &Secret<String>) -> Result<UserProfile> {
        let request = Request::builder()
            .path(self.routes.profile())
            .method(Method::GET)
            .build()?;
        let response = self.send(&with_bearer(&request, access_token)?).await?;
        decode(&response)
    }

    fn device_document(&self, device_id: Option<&str>) -> Value {
        let mut device = Map::new();
        let fields = [
            ("deviceId", device_id),
            ("appVersion", self.device.app_version.as_deref()),
            ("platform", self.device.platform.as_deref()),
            ("platformVersion", self.device.platform_version.as_deref()),
            ("sdkVersion", Some(env!("CARGO_PKG_VERSION"))),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                device.insert(name.into(), Value::String(value.to_owned()));
            }
        }
        Value::Object(device)
    }
}

/// Copy of `request` carrying `token` as its bearer credential.
pub(crate) fn with_bearer(
    request: &Request,
    token: &Secret<String>,
) -> std::result::Result<Request, RequestBuildError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
        .map_err(|e| RequestBuildError::InvalidHeader(format!("authorization: {e}")))?;
    value.set_sensitive(true);
    Ok(request.with_header(AUTHORIZATION, value))
}

/// Decode a success body, keeping decode failures apart from service errors.
pub(crate) fn decode<T: DeserializeOwned>(response: &Response) -> Result<T> {
    response
        .json()
        .map_err(|e| Error::Decoding(e.to_string()))
}
