use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes under `/profile`, an intercepted prefix with no role rule: any verified role may
/// enter under the default unmatched-path policy.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /profile/session
        // The caller's verified role, subject and expiry.
        .route("/profile/session", get(handlers::get_session))
}
