use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// None of these paths are in the gate's matcher, so they are never evaluated.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /gate/check
        // Forward-auth decision for a reverse proxy sitting in front of the portal.
        .route("/gate/check", get(handlers::check_access))
}
