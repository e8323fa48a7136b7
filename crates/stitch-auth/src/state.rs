//! Auth State: the single source of truth for the current session
//!
//! One async mutex guards the `AuthInfo` snapshot. Callers that must check
//! the session and act on it atomically (building a request with the
//! current token) do so inside `with_current`, so a concurrent logout or
//! renewal cannot interleave and leave a request with a stale token.
//!
//! Listeners are notified once per effective transition, after the lock is
//! released, so a listener may call back into the client. A second mutex,
//! taken before the state lock is released and held until notification
//! finishes, keeps events in the order the transitions were applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::auth_info::AuthInfo;
use crate::credential::ProviderType;
use crate::error::Result;
use crate::storage::Storage;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The caller logged out.
    Requested,
    /// The session could not be renewed and was discarded.
    SessionExpired,
}

/// A change to the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was established, or a different user replaced the previous one.
    LoggedIn {
        user_id: String,
        provider_type: ProviderType,
    },
    /// Same user, new snapshot (renewed tokens, linked identity, new profile).
    SessionUpdated { user_id: String },
    LoggedOut {
        user_id: String,
        reason: LogoutReason,
    },
}

/// Receives `AuthEvent`s. Implemented for any `Fn(&AuthEvent)`.
pub trait AuthListener: Send + Sync {
    fn on_auth_event(&self, event: &AuthEvent);
}

impl<F> AuthListener for F
where
    F: Fn(&AuthEvent) + Send + Sync,
{
    fn on_auth_event(&self, event: &AuthEvent) {
        self(event);
    }
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Arc<dyn AuthListener>)>>,
}

impl ListenerRegistry {
    fn add(&self, listener: Arc<dyn AuthListener>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn remove(&self, id: u64) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(entry_id, _)| *entry_id != id);
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn notify(&self, event: &AuthEvent) {
        // Snapshot so listeners run without the registry lock held
        let listeners: Vec<Arc<dyn AuthListener>> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_auth_event(event);
        }
    }
}

/// Handle for a registered listener.
///
/// The listener stays registered while the handle is alive; dropping the
/// handle (or calling `unsubscribe`) removes it.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the listener now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[derive(Default)]
struct Inner {
    info: Option<AuthInfo>,
    /// Last device id the server assigned; kept across logout so the next
    /// login reports the same device.
    device_id: Option<String>,
}

/// Current session, its persistence, and its listeners.
pub struct AuthState {
    inner: AsyncMutex<Inner>,
    notify_order: AsyncMutex<()>,
    storage: Arc<dyn Storage>,
    listeners: Arc<ListenerRegistry>,
}

impl AuthState {
    /// Create the state, restoring any session found in `storage`.
    pub fn load(storage: Arc<dyn Storage>) -> Result<Self> {
        let info = storage.load()?;
        if let Some(ref info) = info {
            info!(user_id = %info.user_id, "restored stored session");
        }
        let device_id = info.as_ref().and_then(|i| i.device_id.clone());
        Ok(Self {
            inner: AsyncMutex::new(Inner { info, device_id }),
            notify_order: AsyncMutex::new(()),
            storage,
            listeners: Arc::new(ListenerRegistry::default()),
        })
    }

    /// Snapshot of the current session.
    pub async fn current(&self) -> Option<AuthInfo> {
        self.inner.lock().await.info.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.inner.lock().await.info.is_some()
    }

    /// Device id to report on the next login.
    pub async fn device_id(&self) -> Option<String> {
        self.inner.lock().await.device_id.clone()
    }

    /// Run `f` against the current session with the lock held.
    ///
    /// `f` must not block or call back into this `AuthState`.
    pub async fn with_current<R>(&self, f: impl FnOnce(Option<&AuthInfo>) -> R) -> R {
        let inner = self.inner.lock().await;
        f(inner.info.as_ref())
    }

    /// Swap in a new snapshot, persist it, and notify listeners.
    ///
    /// Persistence failures are logged; the in-memory session stays
    /// authoritative. Replacing a snapshot with an identical one is not a
    /// transition and notifies nobody.
    pub async fn replace(&self, info: AuthInfo) {
        let (event, _order) = {
            let mut inner = self.inner.lock().await;
            let event = transition_event(inner.info.as_ref(), &info);
            if event.is_some() {
                self.persist(&info);
                if info.device_id.is_some() {
                    inner.device_id.clone_from(&info.device_id);
                }
                inner.info = Some(info);
            }
            (event, self.notify_order.lock().await)
        };
        if let Some(event) = event {
            debug!(?event, "auth state replaced");
            self.listeners.notify(&event);
        }
    }

    /// Apply `f` to the current session if it still belongs to `user_id`.
    ///
    /// Used by renewal, which must not resurrect a session that was logged
    /// out (or replaced by another user) while the renewal was in flight.
    /// Returns the new snapshot, or `None` when nothing was applied.
    pub async fn update_if_current(
        &self,
        user_id: &str,
        f: impl FnOnce(&AuthInfo) -> AuthInfo,
    ) -> Option<AuthInfo> {
        let (updated, event, _order) = {
            let mut inner = self.inner.lock().await;
            let current = inner.info.as_ref().filter(|i| i.user_id == user_id)?;
            let updated = f(current);
            let event = transition_event(Some(current), &updated);
            if event.is_some() {
                self.persist(&updated);
                if updated.device_id.is_some() {
                    inner.device_id.clone_from(&updated.device_id);
                }
                inner.info = Some(updated.clone());
            }
            (updated, event, self.notify_order.lock().await)
        };
        if let Some(event) = event {
            self.listeners.notify(&event);
        }
        Some(updated)
    }

    /// Discard the session. Returns whether one existed.
    ///
    /// Notifies listeners only when a session was actually removed.
    pub async fn clear(&self, reason: LogoutReason) -> bool {
        let (removed, _order) = {
            let mut inner = self.inner.lock().await;
            let removed = inner.info.take();
            if removed.is_some() {
                if let Err(e) = self.storage.clear() {
                    warn!(error = %e, "failed to clear stored session");
                }
            }
            (removed, self.notify_order.lock().await)
        };
        self.announce_cleared(removed, reason)
    }

    /// Discard the session only if it still belongs to `user_id`.
    pub async fn clear_if_current(&self, user_id: &str, reason: LogoutReason) -> bool {
        let (removed, _order) = {
            let mut inner = self.inner.lock().await;
            let removed = if inner.info.as_ref().is_some_and(|i| i.user_id == user_id) {
                if let Err(e) = self.storage.clear() {
                    warn!(error = %e, "failed to clear stored session");
                }
                inner.info.take()
            } else {
                None
            };
            (removed, self.notify_order.lock().await)
        };
        self.announce_cleared(removed, reason)
    }

    /// Register a listener for session changes.
    pub fn subscribe(&self, listener: impl AuthListener + 'static) -> Subscription {
        let id = self.listeners.add(Arc::new(listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn announce_cleared(&self, removed: Option<AuthInfo>, reason: LogoutReason) -> bool {
        match removed {
            Some(info) => {
                info!(user_id = %info.user_id, ?reason, "session cleared");
                self.listeners.notify(&AuthEvent::LoggedOut {
                    user_id: info.user_id,
                    reason,
                });
                true
            }
            None => false,
        }
    }

    fn persist(&self, info: &AuthInfo) {
        if let Err(e) = self.storage.save(info) {
            warn!(user_id = %info.user_id, error = %e, "failed to persist session");
        }
    }
}

fn transition_event(previous: Option<&AuthInfo>, next: &AuthInfo) -> Option<AuthEvent> {
    match previous {
        Some(prev) if prev == next => None,
        Some(prev) if prev.user_id == next.user_id => Some(AuthEvent::SessionUpdated {
            user_id: next.user_id.clone(),
        }),
        _ => Some(AuthEvent::LoggedIn {
            user_id: next.user_id.clone(),
            provider_type: next.logged_in_provider_type,
        }),
    }
}
