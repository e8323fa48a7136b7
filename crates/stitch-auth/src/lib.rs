//! Session state for the Stitch client
//!
//! Holds everything the client knows about the current login: the
//! `AuthInfo` snapshot, the credentials that can produce one, persistence of
//! that snapshot, and the wire types returned by the login and session
//! endpoints. This crate performs no network I/O.
//!
//! Session lifecycle:
//! 1. Caller picks a `Credential` and the client posts its `material()`
//! 2. The login response and profile become an `AuthInfo`
//! 3. `AuthState::replace` stores it, persists via `Storage`, notifies listeners
//! 4. Session renewal replaces the snapshot with new tokens (`AuthInfo::with_session`)
//! 5. Logout or a failed renewal calls `AuthState::clear`

pub mod auth_info;
pub mod constants;
pub mod credential;
pub mod error;
pub mod state;
pub mod storage;
pub mod token;

pub use auth_info::{AuthInfo, Identity, UserProfile};
pub use constants::*;
pub use credential::{Credential, OAuth2Credential, ProviderType};
pub use error::{Error, Result};
pub use state::{AuthEvent, AuthListener, AuthState, LogoutReason, Subscription};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use token::{AccessTokenClaims, LoginResponse, SessionFields, SessionTokens};
