//! Login credentials
//!
//! One variant per authentication provider. Encoding a credential for the
//! login call is a pure function of the variant (`material`); no provider
//! needs more than the fields it carries.

use std::fmt;

use common::Secret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Provider type reported by the server and stored with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "anon-user")]
    AnonUser,
    #[serde(rename = "local-userpass")]
    LocalUserPass,
    #[serde(rename = "api-key")]
    ApiKey,
    #[serde(rename = "custom-function")]
    CustomFunction,
    #[serde(rename = "custom-token")]
    CustomToken,
    #[serde(rename = "oauth2-google")]
    Google,
    #[serde(rename = "oauth2-facebook")]
    Facebook,
}

impl ProviderType {
    /// Wire name, also the default provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::AnonUser => "anon-user",
            ProviderType::LocalUserPass => "local-userpass",
            ProviderType::ApiKey => "api-key",
            ProviderType::CustomFunction => "custom-function",
            ProviderType::CustomToken => "custom-token",
            ProviderType::Google => "oauth2-google",
            ProviderType::Facebook => "oauth2-facebook",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials issued by an OAuth 2.0 identity provider.
#[derive(Debug, Clone)]
pub enum OAuth2Credential {
    /// Server auth code from Google sign-in.
    Google { auth_code: Secret<String> },
    /// User access token from Facebook login.
    Facebook { access_token: Secret<String> },
}

/// A credential that can be exchanged for a session.
#[derive(Debug, Clone)]
pub enum Credential {
    Anonymous,
    UserPassword {
        username: String,
        password: Secret<String>,
    },
    /// Key created by a user for their own account.
    UserApiKey { key: Secret<String> },
    /// Key created by an administrator for server-side use.
    ServerApiKey { key: Secret<String> },
    /// Arbitrary document handed to an app-defined authentication function.
    CustomFunction { payload: Map<String, Value> },
    /// JWT signed by an external authentication system.
    CustomToken { token: Secret<String> },
    OAuth2(OAuth2Credential),
}

impl Credential {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Credential::Anonymous => ProviderType::AnonUser,
            Credential::UserPassword { .. } => ProviderType::LocalUserPass,
            Credential::UserApiKey { .. } | Credential::ServerApiKey { .. } => {
                ProviderType::ApiKey
            }
            Credential::CustomFunction { .. } => ProviderType::CustomFunction,
            Credential::CustomToken { .. } => ProviderType::CustomToken,
            Credential::OAuth2(OAuth2Credential::Google { .. }) => ProviderType::Google,
            Credential::OAuth2(OAuth2Credential::Facebook { .. }) => ProviderType::Facebook,
        }
    }

    /// Name of the provider instance the login route is addressed to.
    pub fn provider_name(&self) -> &'static str {
        self.provider_type().as_str()
    }

    /// Login request payload.
    pub fn material(&self) -> Value {
        match self {
            Credential::Anonymous => json!({}),
            Credential::UserPassword { username, password } => json!({
                "username": username,
                "password": password.expose(),
            }),
            Credential::UserApiKey { key } | Credential::ServerApiKey { key } => {
                json!({ "key": key.expose() })
            }
            Credential::CustomFunction { payload } => Value::Object(payload.clone()),
            Credential::CustomToken { token } => json!({ "token": token.expose() }),
            Credential::OAuth2(OAuth2Credential::Google { auth_code }) => {
                json!({ "authCode": auth_code.expose() })
            }
            Credential::OAuth2(OAuth2Credential::Facebook { access_token }) => {
                json!({ "accessToken": access_token.expose() })
            }
        }
    }

    /// Whether logging in while a session exists should keep that session
    /// instead of calling the server.
    pub fn reuses_existing_session(&self) -> bool {
        matches!(self, Credential::Anonymous)
    }

    /// Whether the credential stays valid long enough to log in again when a
    /// session cannot be renewed with a refresh token.
    pub fn supports_relogin(&self) -> bool {
        matches!(
            self,
            Credential::UserApiKey { .. } | Credential::ServerApiKey { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_type_serializes_to_wire_name() {
        let json = serde_json::to_string(&ProviderType::LocalUserPass).unwrap();
        assert_eq!(json, "\"local-userpass\"");
        let back: ProviderType = serde_json::from_str("\"oauth2-google\"").unwrap();
        assert_eq!(back, ProviderType::Google);
    }

    #[test]
    fn as_str_matches_serde_name() {
        for provider in [
            ProviderType::AnonUser,
            ProviderType::LocalUserPass,
            ProviderType::ApiKey,
            ProviderType::CustomFunction,
            ProviderType::CustomToken,
            ProviderType::Google,
            ProviderType::Facebook,
        ] {
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(json, format!("\"{}\"", provider.as_str()));
        }
    }

    #[test]
    fn anonymous_material_is_empty_document() {
        assert_eq!(Credential::Anonymous.material(), json!({}));
        assert_eq!(Credential::Anonymous.provider_name(), "anon-user");
    }

    #[test]
    fn user_password_material() {
        let credential = Credential::UserPassword {
            username: "ada@example.com".into(),
            password: "hunter2".into(),
        };
        assert_eq!(
            credential.material(),
            json!({"username": "ada@example.com", "password": "hunter2"})
        );
        assert_eq!(credential.provider_type(), ProviderType::LocalUserPass);
    }

    #[test]
    fn api_keys_share_provider_type() {
        let user = Credential::UserApiKey { key: "uk".into() };
        let server = Credential::ServerApiKey { key: "sk".into() };
        assert_eq!(user.provider_type(), ProviderType::ApiKey);
        assert_eq!(server.provider_type(), ProviderType::ApiKey);
        assert_eq!(server.material(), json!({"key": "sk"}));
    }

    #[test]
    fn oauth2_material_uses_provider_field_names() {
        let google = Credential::OAuth2(OAuth2Credential::Google {
            auth_code: "code".into(),
        });
        let facebook = Credential::OAuth2(OAuth2Credential::Facebook {
            access_token: "fb".into(),
        });
        assert_eq!(google.material(), json!({"authCode": "code"}));
        assert_eq!(facebook.material(), json!({"accessToken": "fb"}));
        assert_eq!(facebook.provider_name(), "oauth2-facebook");
    }

    #[test]
    fn custom_function_material_is_payload() {
        let mut payload = Map::new();
        payload.insert("ticket".into(), json!("abc"));
        let credential = Credential::CustomFunction { payload };
        assert_eq!(credential.material(), json!({"ticket": "abc"}));
    }

    #[test]
    fn only_anonymous_reuses_session() {
        assert!(Credential::Anonymous.reuses_existing_session());
        assert!(!Credential::CustomToken { token: "t".into() }.reuses_existing_session());
    }

    #[test]
    fn only_api_keys_support_relogin() {
        assert!(Credential::ServerApiKey { key: "k".into() }.supports_relogin());
        assert!(Credential::UserApiKey { key: "k".into() }.supports_relogin());
        assert!(!Credential::Anonymous.supports_relogin());
    }

    #[test]
    fn debug_redacts_secrets() {
        let credential = Credential::UserPassword {
            username: "ada".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{credential:?}");
        assert!(!debug.contains("hunter2"), "got: {debug}");
    }
}
