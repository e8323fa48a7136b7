//! Client metrics
//!
//! Recorded through the `metrics` facade; the host application installs
//! whichever recorder it exports with. Without one these calls are no-ops.
//!
//! - `stitch_requests_total` (counter): label `outcome` (`success` or an
//!   error kind such as `service`, `transport`, `refresh_failed`)
//! - `stitch_session_refresh_total` (counter): label `outcome` (`renewed`,
//!   `relogin`, `failed`)

/// Record a finished authenticated request.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("stitch_requests_total", "outcome" => outcome).increment(1);
}

/// Record a finished session refresh.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("stitch_session_refresh_total", "outcome" => outcome).increment(1);
}
