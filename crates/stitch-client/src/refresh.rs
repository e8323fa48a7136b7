//! Session refresh: single-flight renewal and proactive background refresh
//!
//! When a request is rejected with `InvalidSession`, the caller hands the
//! access token it sent to `SessionRefresher::refresh`. The first caller for
//! a given stale token starts the renewal; everyone else who sent that token
//! joins the same shared future and observes the same outcome. A caller
//! whose token was already replaced skips renewal and simply retries.
//!
//! The renewal itself runs on its own task, so a caller that is cancelled
//! while waiting does not cancel it for the others. The finished future
//! stays in the slot (keyed by the stale token) so a caller arriving late
//! with the same stale token still gets that outcome instead of starting a
//! second renewal.
//!
//! Outcomes:
//! - Renewed: `AuthState` carries the new access token; callers retry once
//! - Failed: `AuthState` is cleared (`LogoutReason::SessionExpired`); callers
//!   get `Error::RefreshFailed` and do not retry

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, SystemTime};

use common::Secret;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use stitch_auth::{AccessTokenClaims, AuthInfo, Credential, LogoutReason, SessionTokens};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use transport::{Method, Request};

use crate::error::{Error, Result};
use crate::metrics::record_refresh;
use crate::request::AuthenticatedRequest;
use crate::session::Session;

type RefreshOutcome = std::result::Result<(), Arc<Error>>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    stale_token: Secret<String>,
    refresh: SharedRefresh,
}

/// Coordinates renewals so at most one runs per stale access token.
pub struct SessionRefresher {
    session: Arc<Session>,
    /// Credential that can log in again when there is no refresh token.
    relogin: StdMutex<Option<Credential>>,
    in_flight: Mutex<Option<InFlight>>,
}

impl SessionRefresher {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            relogin: StdMutex::new(None),
            in_flight: Mutex::new(None),
        }
    }

    /// Keep `credential` in memory for re-login, if it supports it.
    pub(crate) fn retain_credential(&self, credential: Option<Credential>) {
        *self.relogin.lock().unwrap_or_else(PoisonError::into_inner) =
            credential.filter(Credential::supports_relogin);
    }

    /// Whether a renewal of `info` has anything to renew with.
    pub(crate) fn can_refresh(&self, info: &AuthInfo) -> bool {
        info.refresh_token.is_some()
            || self
                .relogin
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
    }

    /// Renew the session whose access token `stale_token` was rejected.
    ///
    /// Returns `Ok` when the caller should retry with the current token.
    pub(crate) async fn refresh(&self, stale_token: &Secret<String>) -> Result<()> {
        let refresh = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(in_flight) if in_flight.stale_token == *stale_token => {
                    debug!("joining in-flight session refresh");
                    in_flight.refresh.clone()
                }
                _ => {
                    let current = self
                        .session
                        .state
                        .current()
                        .await
                        .ok_or(Error::NotAuthenticated)?;
                    if current.access_token != *stale_token {
                        // The current token may itself be under renewal
                        match slot.as_ref() {
                            Some(in_flight) if in_flight.stale_token == current.access_token => {
                                debug!(
                                    user_id = %current.user_id,
                                    "waiting for renewal of the current session"
                                );
                                in_flight.refresh.clone()
                            }
                            _ => {
                                debug!(
                                    user_id = %current.user_id,
                                    "session already renewed, retrying"
                                );
                                return Ok(());
                            }
                        }
                    } else {
                        self.begin(&mut slot, current)
                    }
                }
            }
        };
        refresh.await.map_err(Error::RefreshFailed)
    }

    fn begin(&self, slot: &mut Option<InFlight>, current: AuthInfo) -> SharedRefresh {
        let stale_token = current.access_token.clone();
        let refresh = self.start(current);
        *slot = Some(InFlight {
            stale_token,
            refresh: refresh.clone(),
        });
        refresh
    }

    fn start(&self, current: AuthInfo) -> SharedRefresh {
        let session = Arc::clone(&self.session);
        let relogin = self
            .relogin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        info!(user_id = %current.user_id, "session refresh started");

        let task = tokio::spawn(renew(session, relogin, current));
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(Arc::new(Error::Aborted(format!("session refresh: {e}")))),
            }
        }
        .boxed()
        .shared()
    }
}

/// Run one renewal and apply its outcome to `AuthState`.
async fn renew(
    session: Arc<Session>,
    relogin: Option<Credential>,
    current: AuthInfo,
) -> RefreshOutcome {
    let result = match (&current.refresh_token, relogin) {
        (Some(_), _) => renew_with_refresh_token(&session, &current)
            .await
            .map(|()| "renewed"),
        (None, Some(credential)) => relogin_with(&session, &credential, &current)
            .await
            .map(|()| "relogin"),
        (None, None) => Err(Error::NotAuthenticated),
    };

    match result {
        Ok(outcome) => {
            info!(user_id = %current.user_id, outcome, "session refresh succeeded");
            record_refresh(outcome);
            Ok(())
        }
        Err(e) => {
            warn!(user_id = %current.user_id, error = %e, "session refresh failed, logging out");
            record_refresh("failed");
            session
                .state
                .clear_if_current(&current.user_id, LogoutReason::SessionExpired)
                .await;
            Err(Arc::new(e))
        }
    }
}

/// `POST` the session route with the refresh token.
async fn renew_with_refresh_token(session: &Session, current: &AuthInfo) -> Result<()> {
    let request = Request::builder()
        .path(session.routes.session())
        .method(Method::POST)
        .build()?;
    let request = AuthenticatedRequest::with_refresh_token(request);
    let (prepared, _) = Session::authorize(&request, Some(current))?;

    let response = session.send(&prepared).await?;
    let tokens = SessionTokens::parse(&response.body, &session.session_fields)
        .map_err(|e| Error::Decoding(e.to_string()))?;

    session
        .state
        .update_if_current(&current.user_id, move |info| info.with_session(tokens))
        .await
        .ok_or(Error::NotAuthenticated)?;
    Ok(())
}

/// Full login with a retained credential.
async fn relogin_with(session: &Session, credential: &Credential, current: &AuthInfo) -> Result<()> {
    let renewed = session.establish(credential).await?;
    session
        .state
        .update_if_current(&current.user_id, move |_| renewed)
        .await
        .ok_or(Error::NotAuthenticated)?;
    Ok(())
}

/// Spawn a background task that renews the session before its access
/// token expires.
///
/// Runs every `interval` and renews when the token's `exp` claim is within
/// `threshold`. Renewal goes through the same single-flight path as the
/// request path, so it never races a request-triggered refresh. Tokens
/// without a readable expiry are left to request-time refresh.
///
/// Returns a `JoinHandle` for the spawned task.
pub fn spawn_proactive_refresh(
    refresher: Arc<SessionRefresher>,
    interval: Duration,
    threshold: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            refresh_cycle(&refresher, threshold).await;
        }
    })
}

/// Run one proactive check.
async fn refresh_cycle(refresher: &SessionRefresher, threshold: Duration) {
    let Some(current) = refresher.session.state.current().await else {
        return;
    };

    let claims = match AccessTokenClaims::decode(current.access_token.expose()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "access token has no readable expiry, skipping");
            return;
        }
    };
    if !claims.expires_within(threshold, SystemTime::now()) {
        return;
    }
    if !refresher.can_refresh(&current) {
        debug!(user_id = %current.user_id, "access token expiring but nothing to renew with");
        return;
    }

    debug!(user_id = %current.user_id, "access token expiring within threshold, refreshing");
    if let Err(e) = refresher.refresh(&current.access_token).await {
        warn!(user_id = %current.user_id, error = %e, "proactive session refresh failed");
    }
}
