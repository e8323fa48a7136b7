//! The authenticated request client
//!
//! `StitchClient` is cheap to clone; clones share one session, one refresher
//! and one transport. All operations are safe to call concurrently.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use stitch_auth::{
    AuthInfo, AuthListener, AuthState, Credential, LogoutReason, Storage, Subscription,
};
use tracing::{debug, info, instrument, warn};
use transport::{
    Method, Request, ReqwestTransport, Response, StreamResponse, Transport, json_body,
};

use crate::config::{ClientConfig, ProactiveRefreshConfig};
use crate::error::{Error, Result};
use crate::metrics::record_request;
use crate::refresh::{SessionRefresher, spawn_proactive_refresh};
use crate::request::AuthenticatedRequest;
use crate::routes::Routes;
use crate::service_error::classify_response;
use crate::session::{Session, decode};
use crate::stream::{ClientEventStream, into_client_stream};

/// Answer to a link call. The server may or may not issue a new access token.
#[derive(Debug, Deserialize)]
struct LinkResponse {
    user_id: String,
    #[serde(default)]
    access_token: Option<Secret<String>>,
}

/// Client for one Stitch app.
#[derive(Clone)]
pub struct StitchClient {
    session: Arc<Session>,
    refresher: Arc<SessionRefresher>,
    proactive: ProactiveRefreshConfig,
}

impl StitchClient {
    /// Create a client over an explicit transport and storage.
    ///
    /// Any session found in `storage` is restored, so a restarted process
    /// continues where it left off.
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        config.validate()?;
        let state = Arc::new(AuthState::load(storage)?);
        let session = Arc::new(Session {
            transport,
            state,
            routes: Routes::new(&config.client_app_id),
            request_timeout: config.request_timeout(),
            session_fields: config.session_fields.clone(),
            device: config.device.clone(),
        });
        info!(
            app_id = %config.client_app_id,
            base_url = %config.base_url,
            "stitch client initialized"
        );
        Ok(Self {
            refresher: Arc::new(SessionRefresher::new(Arc::clone(&session))),
            session,
            proactive: config.proactive_refresh.clone(),
        })
    }

    /// Create a client talking HTTP to `config.base_url`, persisting the
    /// session where `config.storage_path` says.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.base_url)?;
        Self::new(config, Arc::new(transport), config.storage())
    }

    /// Start proactive background refresh, unless disabled in config.
    ///
    /// Must be called from within a tokio runtime. The task runs until the
    /// handle is aborted.
    pub fn start_background_refresh(&self) -> Option<tokio::task::JoinHandle<()>> {
        if !self.proactive.enabled {
            return None;
        }
        Some(spawn_proactive_refresh(
            Arc::clone(&self.refresher),
            Duration::from_secs(self.proactive.interval_secs),
            Duration::from_secs(self.proactive.threshold_secs),
        ))
    }

    pub fn routes(&self) -> &Routes {
        &self.session.routes
    }

    /// Snapshot of the current session.
    pub async fn current_auth_info(&self) -> Option<AuthInfo> {
        self.session.state.current().await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.state.is_logged_in().await
    }

    /// Register a listener for login, renewal and logout events.
    pub fn subscribe(&self, listener: impl AuthListener + 'static) -> Subscription {
        self.session.state.subscribe(listener)
    }

    /// Perform an authenticated request.
    ///
    /// On `InvalidSession`, when the request allows it, the session is
    /// renewed (sharing any renewal already in flight) and the request is
    /// sent once more. Whatever that retry returns is final.
    #[instrument(
        skip_all,
        fields(method = %request.request().method(), path = %request.request().path())
    )]
    pub async fn execute(&self, request: &AuthenticatedRequest) -> Result<Response> {
        let result = self
            .with_refresh(request, |prepared| async move {
                self.session.send(&prepared).await
            })
            .await;
        record_request(match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        });
        result
    }

    /// Perform an authenticated request and decode its JSON body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &AuthenticatedRequest,
    ) -> Result<T> {
        let response = self.execute(request).await?;
        decode(&response)
    }

    /// Call a server-side function and decode its result.
    pub async fn call_function<T: DeserializeOwned>(
        &self,
        name: &str,
        arguments: &[Value],
    ) -> Result<T> {
        let builder = Request::builder()
            .path(self.session.routes.function_call())
            .method(Method::POST);
        let body = json!({ "name": name, "arguments": arguments });
        let request = json_body(builder, &body).build()?;
        debug!(function = name, "calling function");
        self.execute_json(&AuthenticatedRequest::new(request)).await
    }

    /// Call a server-side function and return its raw JSON result.
    pub async fn call_function_raw(&self, name: &str, arguments: &[Value]) -> Result<Value> {
        self.call_function(name, arguments).await
    }

    /// Open an authenticated server-sent event stream.
    ///
    /// The same refresh-and-retry-once rule as `execute` applies to the
    /// answer that opens the stream. Streams carry no default timeout.
    #[instrument(skip_all, fields(path = %request.request().path()))]
    pub async fn open_stream(&self, request: &AuthenticatedRequest) -> Result<ClientEventStream> {
        let result = self
            .with_refresh(request, |prepared| async move {
                match self.session.transport.open_stream(&prepared).await? {
                    StreamResponse::Open(events) => Ok(into_client_stream(events)),
                    StreamResponse::Rejected(response) => Err(classify_response(&response)),
                }
            })
            .await;
        record_request(match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        });
        result
    }

    /// Log in with `credential`.
    ///
    /// A credential that reuses existing sessions returns the current user
    /// without a network call when one is logged in. Otherwise any current
    /// session is logged out first.
    #[instrument(skip_all, fields(provider = %credential.provider_type()))]
    pub async fn login(&self, credential: Credential) -> Result<AuthInfo> {
        if credential.reuses_existing_session() {
            if let Some(current) = self.session.state.current().await {
                debug!(user_id = %current.user_id, "reusing existing session");
                return Ok(current);
            }
        }

        if self.is_logged_in().await {
            self.logout().await;
        }

        let auth_info = self.session.establish(&credential).await?;
        self.refresher.retain_credential(Some(credential));
        self.session.state.replace(auth_info.clone()).await;
        info!(user_id = %auth_info.user_id, "logged in");
        Ok(auth_info)
    }

    /// Link `credential`'s identity to the current user.
    #[instrument(skip_all, fields(provider = %credential.provider_type()))]
    pub async fn link_with_credential(&self, credential: Credential) -> Result<AuthInfo> {
        let current = self
            .session
            .state
            .current()
            .await
            .ok_or(Error::NotAuthenticated)?;
        let request =
            self.session
                .login_request(&credential, true, current.device_id.as_deref())?;
        let response = self.execute(&AuthenticatedRequest::new(request)).await?;
        let link: LinkResponse = decode(&response)?;

        // The link call may have renewed the session; read the token again
        let access_token = match link.access_token.clone() {
            Some(token) => token,
            None => self
                .session
                .state
                .current()
                .await
                .ok_or(Error::NotAuthenticated)?
                .access_token,
        };
        let profile = self.session.fetch_profile(&access_token).await?;

        let provider_type = credential.provider_type();
        let linked = self
            .session
            .state
            .update_if_current(&link.user_id, move |info| {
                let mut next = info.with_profile(profile);
                next.access_token = access_token;
                next.logged_in_provider_type = provider_type;
                next.logged_in_provider_name = provider_type.as_str().to_owned();
                next
            })
            .await
            .ok_or(Error::NotAuthenticated)?;
        info!(user_id = %linked.user_id, provider = %provider_type, "identity linked");
        Ok(linked)
    }

    /// End the session.
    ///
    /// The server is asked to revoke the refresh token, but the local
    /// session is cleared whether or not that succeeds.
    #[instrument(skip_all)]
    pub async fn logout(&self) {
        let Some(current) = self.session.state.current().await else {
            return;
        };

        if current.refresh_token.is_some() {
            if let Err(e) = self.revoke_session().await {
                warn!(
                    user_id = %current.user_id,
                    error = %e,
                    "server-side logout failed, clearing local session anyway"
                );
            }
        }

        self.refresher.retain_credential(None);
        self.session.state.clear(LogoutReason::Requested).await;
        info!(user_id = %current.user_id, "logged out");
    }

    async fn revoke_session(&self) -> Result<Response> {
        let request = Request::builder()
            .path(self.session.routes.session())
            .method(Method::DELETE)
            .build()?;
        self.execute(&AuthenticatedRequest::with_refresh_token(request))
            .await
    }

    /// Attach the current token, run `attempt`, and on a refreshable
    /// invalid-session failure renew and run it exactly once more.
    async fn with_refresh<T, F, Fut>(&self, request: &AuthenticatedRequest, attempt: F) -> Result<T>
    where
        F: Fn(Request) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (prepared, token) = self.session.prepare(request).await?;
        match attempt(prepared).await {
            Err(e) if e.is_invalid_session() && request.should_refresh_on_failure() => {
                debug!(error = %e, "invalid session, refreshing before retry");
                self.refresher.refresh(&token).await?;
                let (prepared, _) = self.session.prepare(request).await?;
                attempt(prepared).await
            }
            other => other,
        }
    }
}
