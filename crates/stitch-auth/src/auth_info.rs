//! The authenticated session snapshot

use common::Secret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::credential::ProviderType;
use crate::token::SessionTokens;

/// Everything known about the current session.
///
/// Snapshots are never mutated in place: every change produces a new value
/// that replaces the old one wholesale in `AuthState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub user_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    pub access_token: Secret<String>,
    #[serde(default)]
    pub refresh_token: Option<Secret<String>>,
    pub logged_in_provider_type: ProviderType,
    pub logged_in_provider_name: String,
    #[serde(default)]
    pub user_profile: UserProfile,
}

impl AuthInfo {
    /// Snapshot carrying renewed tokens. The refresh token is only replaced
    /// when the server issued a new one.
    pub fn with_session(&self, tokens: SessionTokens) -> AuthInfo {
        let mut next = self.clone();
        next.access_token = tokens.access_token;
        if let Some(refresh) = tokens.refresh_token {
            next.refresh_token = Some(refresh);
        }
        next
    }

    pub fn with_profile(&self, profile: UserProfile) -> AuthInfo {
        let mut next = self.clone();
        next.user_profile = profile;
        next
    }
}

/// User identities and metadata as returned by the profile endpoint.
///
/// Opaque to the request path; kept so callers can show who is logged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "type", default)]
    pub user_type: String,
    #[serde(default)]
    pub identities: Vec<Identity>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl UserProfile {
    /// Convenience accessor for string profile fields such as `email` or `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(Value::as_str)
    }
}

/// One identity linked to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub provider_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuthInfo {
        AuthInfo {
            user_id: "user-1".into(),
            device_id: Some("device-1".into()),
            access_token: "A1".into(),
            refresh_token: Some("R1".into()),
            logged_in_provider_type: ProviderType::LocalUserPass,
            logged_in_provider_name: "local-userpass".into(),
            user_profile: UserProfile::default(),
        }
    }

    #[test]
    fn with_session_keeps_refresh_token_when_absent() {
        let renewed = sample().with_session(SessionTokens {
            access_token: "A2".into(),
            refresh_token: None,
        });
        assert_eq!(renewed.access_token.expose(), "A2");
        assert_eq!(renewed.refresh_token.as_ref().unwrap().expose(), "R1");
        assert_eq!(renewed.user_id, "user-1");
    }

    #[test]
    fn with_session_replaces_refresh_token_when_issued() {
        let renewed = sample().with_session(SessionTokens {
            access_token: "A2".into(),
            refresh_token: Some("R2".into()),
        });
        assert_eq!(renewed.refresh_token.as_ref().unwrap().expose(), "R2");
    }

    #[test]
    fn persists_and_restores_with_tokens() {
        let info = sample();
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"access_token\":\"A1\""));
        let back: AuthInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn debug_does_not_leak_tokens() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("A1"), "got: {debug}");
        assert!(!debug.contains("R1"), "got: {debug}");
    }

    #[test]
    fn profile_decodes_server_document() {
        let profile: UserProfile = serde_json::from_str(
            r#"{
                "user_id": "user-1",
                "domain_id": "d",
                "type": "normal",
                "identities": [{"id": "i-1", "provider_type": "local-userpass", "provider_id": "p"}],
                "data": {"email": "ada@example.com"}
            }"#,
        )
        .unwrap();
        assert_eq!(profile.user_type, "normal");
        assert_eq!(profile.identities.len(), 1);
        assert_eq!(profile.identities[0].provider_type, "local-userpass");
        assert_eq!(profile.field("email"), Some("ada@example.com"));
    }
}
