//! Stitch client API constants
//!
//! Paths are relative to the deployment's base URL. App-scoped routes are
//! built by the client from `APP_ROUTE_PREFIX` and the client app id.

/// App-scoped route prefix; the client app id follows.
pub const APP_ROUTE_PREFIX: &str = "/api/client/v2.0/app";

/// Session endpoint: `POST` renews the access token, `DELETE` ends the session.
pub const SESSION_PATH: &str = "/api/client/v2.0/auth/session";

/// Profile of the authenticated user.
pub const PROFILE_PATH: &str = "/api/client/v2.0/auth/profile";

/// Server error code reported when an access token is no longer valid.
pub const INVALID_SESSION_CODE: &str = "InvalidSession";

/// Default field name of the access token in session responses.
pub const DEFAULT_ACCESS_TOKEN_FIELD: &str = "access_token";

/// Default field name of the refresh token in session responses.
pub const DEFAULT_REFRESH_TOKEN_FIELD: &str = "refresh_token";
