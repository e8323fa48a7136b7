//! Login and session response types, and access token claims
//!
//! The login endpoint returns a fixed document (`LoginResponse`). The
//! session renewal response is read through `SessionFields` so that the
//! token field names can be configured per deployment.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use common::Secret;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_ACCESS_TOKEN_FIELD, DEFAULT_REFRESH_TOKEN_FIELD};
use crate::error::{Error, Result};

/// Response from a provider login (or link) call.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub access_token: Secret<String>,
    #[serde(default)]
    pub refresh_token: Option<Secret<String>>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Field names read from the session renewal response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFields {
    #[serde(default = "default_access_token_field")]
    pub access_token: String,
    #[serde(default = "default_refresh_token_field")]
    pub refresh_token: String,
}

fn default_access_token_field() -> String {
    DEFAULT_ACCESS_TOKEN_FIELD.to_owned()
}

fn default_refresh_token_field() -> String {
    DEFAULT_REFRESH_TOKEN_FIELD.to_owned()
}

impl Default for SessionFields {
    fn default() -> Self {
        Self {
            access_token: default_access_token_field(),
            refresh_token: default_refresh_token_field(),
        }
    }
}

/// Tokens issued by a session renewal.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: Secret<String>,
    /// Present only when the server rotated the refresh token.
    pub refresh_token: Option<Secret<String>>,
}

impl SessionTokens {
    /// Read tokens out of a renewal response body.
    ///
    /// The access token field is required; the refresh token field is optional.
    pub fn parse(body: &[u8], fields: &SessionFields) -> Result<Self> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| Error::Serialization(format!("session response: {e}")))?;
        let access_token = document
            .get(&fields.access_token)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingField(fields.access_token.clone()))?;
        let refresh_token = document
            .get(&fields.refresh_token)
            .and_then(Value::as_str)
            .map(Secret::from);
        Ok(Self {
            access_token: access_token.into(),
            refresh_token,
        })
    }
}

/// Timing claims of a JWT access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AccessTokenClaims {
    /// Expiry as unix seconds.
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
}

impl AccessTokenClaims {
    /// Decode the claims segment of a JWT. The signature is not checked;
    /// the server remains the authority on validity.
    pub fn decode(token: &str) -> Result<Self> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) => payload,
            _ => return Err(Error::InvalidToken("expected three JWT segments".into())),
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidToken(format!("claims are not base64url: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidToken(format!("claims are not valid JSON: {e}")))
    }

    /// Whether the token expires within `threshold` of `now`.
    pub fn expires_within(&self, threshold: Duration, now: SystemTime) -> bool {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.exp <= now_secs.saturating_add(threshold.as_secs())
    }
}
