//! Client API routes for one Stitch app

use stitch_auth::{APP_ROUTE_PREFIX, PROFILE_PATH, SESSION_PATH};

/// Paths for the app identified by a client app id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    app_route: String,
}

impl Routes {
    pub fn new(client_app_id: &str) -> Self {
        Self {
            app_route: format!("{APP_ROUTE_PREFIX}/{client_app_id}"),
        }
    }

    /// Root of the app-scoped routes.
    pub fn app_route(&self) -> &str {
        &self.app_route
    }

    /// Login route for a provider; `link` attaches the identity to the
    /// current user instead of starting a new session.
    pub fn login(&self, provider_name: &str, link: bool) -> String {
        let route = format!("{}/auth/providers/{provider_name}/login", self.app_route);
        if link { format!("{route}?link=true") } else { route }
    }

    pub fn function_call(&self) -> String {
        format!("{}/functions/call", self.app_route)
    }

    /// `POST` renews the access token, `DELETE` ends the session.
    pub fn session(&self) -> &'static str {
        SESSION_PATH
    }

    pub fn profile(&self) -> &'static str {
        PROFILE_PATH
    }
}
