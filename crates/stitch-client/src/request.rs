//! Requests that carry a session token

use transport::{Request, RequestBuildError};

/// A `Request` plus the rules for authenticating it.
///
/// `use_refresh_token` picks which token is sent as the bearer credential.
/// `should_refresh_on_failure` allows an invalid-session answer to trigger a
/// session refresh and one retry. A request that already carries the refresh
/// token can never refresh on failure; every constructor upholds that.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    request: Request,
    use_refresh_token: bool,
    should_refresh_on_failure: bool,
}

impl AuthenticatedRequest {
    /// Send with the access token; refresh and retry once on invalid session.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            use_refresh_token: false,
            should_refresh_on_failure: true,
        }
    }

    /// Send with the refresh token. Never refreshes on failure.
    pub fn with_refresh_token(request: Request) -> Self {
        Self {
            request,
            use_refresh_token: true,
            should_refresh_on_failure: false,
        }
    }

    /// Build from explicit flags, rejecting a refresh-token request that
    /// asks to refresh on failure.
    pub fn from_parts(
        request: Request,
        use_refresh_token: bool,
        should_refresh_on_failure: bool,
    ) -> Result<Self, RequestBuildError> {
        if use_refresh_token && should_refresh_on_failure {
            return Err(RequestBuildError::RefreshTokenCannotRefresh);
        }
        Ok(Self {
            request,
            use_refresh_token,
            should_refresh_on_failure,
        })
    }

    /// Same request, surfacing invalid-session answers instead of refreshing.
    pub fn without_refresh_on_failure(mut self) -> Self {
        self.should_refresh_on_failure = false;
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn use_refresh_token(&self) -> bool {
        self.use_refresh_token
    }

    pub fn should_refresh_on_failure(&self) -> bool {
        self.should_refresh_on_failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::Method;

    fn request() -> Request {
        Request::builder()
            .path("/api/client/v2.0/auth/session")
            .method(Method::POST)
            .build()
            .unwrap()
    }

    #[test]
    fn new_uses_access_token_and_refreshes() {
        let authed = AuthenticatedRequest::new(request());
        assert!(!authed.use_refresh_token());
        assert!(authed.should_refresh_on_failure());
    }

    #[test]
    fn refresh_token_request_never_refreshes() {
        let authed = AuthenticatedRequest::with_refresh_token(request());
        assert!(authed.use_refresh_token());
        assert!(!authed.should_refresh_on_failure());
    }

    #[test]
    fn refresh_token_request_with_refresh_flag_is_rejected() {
        let err = AuthenticatedRequest::from_parts(request(), true, true).unwrap_err();
        assert_eq!(err, RequestBuildError::RefreshTokenCannotRefresh);
    }

    #[test]
    fn from_parts_accepts_valid_combinations() {
        for (use_refresh, should_refresh) in [(false, false), (false, true), (true, false)] {
            let authed =
                AuthenticatedRequest::from_parts(request(), use_refresh, should_refresh).unwrap();
            assert_eq!(authed.use_refresh_token(), use_refresh);
            assert_eq!(authed.should_refresh_on_failure(), should_refresh);
        }
    }

    #[test]
    fn without_refresh_on_failure_clears_flag() {
        let authed = AuthenticatedRequest::new(request()).without_refresh_on_failure();
        assert!(!authed.should_refresh_on_failure());
        assert_eq!(authed.request().path(), "/api/client/v2.0/auth/session");
    }
}
