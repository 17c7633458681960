use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    auth::{AuthUser, token_from_cookies},
    gate::{Disposition, GateState},
    models::{AccessDecision, DecisionResponse, SessionView},
    policy::{normalize_path, path_of},
};

/// Header a reverse proxy uses to tell the forward-auth endpoint which URI it is about to serve.
pub const FORWARDED_URI: &str = "x-forwarded-uri";

/// CheckQuery
///
/// Fallback way to name the path under test when the proxy does not send `X-Forwarded-Uri`.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckQuery {
    /// Request target to evaluate, e.g. `/student/tests?page=2`.
    pub path: Option<String>,
}

/// check_access
///
/// [Public Route] Forward-auth endpoint. Evaluates the forwarded path against the caller's
/// access-token cookie. Allow answers 200; a denial answers 303 with `Location` so the proxy
/// can pass the redirect straight to the browser. A target that is allowed but not in its
/// canonical spelling answers 307 with the canonical `Location`, never 200, because the
/// proxy would forward the raw spelling unchanged.
#[utoipa::path(
    get,
    path = "/gate/check",
    params(CheckQuery),
    responses(
        (status = 200, description = "Allowed", body = DecisionResponse),
        (status = 303, description = "Redirect to login or unauthorized page", body = DecisionResponse),
        (status = 307, description = "Redirect to the canonical spelling of the path", body = DecisionResponse)
    )
)]
pub async fn check_access(
    State(gate): State<GateState>,
    Query(query): Query<CheckQuery>,
    headers: HeaderMap,
) -> Response {
    let target = headers
        .get(FORWARDED_URI)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .or(query.path)
        .unwrap_or_else(|| "/".to_string());
    let raw_path = path_of(&target);
    let forwarded_query = target
        .split_once('?')
        .map(|(_, rest)| path_of_query(rest))
        .filter(|query| !query.is_empty());

    let credential = token_from_cookies(&headers, gate.cookie_name());
    let path = normalize_path(raw_path);

    let (status, decision, location) = match gate.dispose(raw_path, forwarded_query, credential) {
        Disposition::Forward { .. } => (StatusCode::OK, AccessDecision::Allow, None),
        Disposition::Deny { decision, location } => (StatusCode::SEE_OTHER, decision, Some(location)),
        Disposition::Canonicalize { location } => {
            (StatusCode::TEMPORARY_REDIRECT, AccessDecision::Allow, Some(location))
        }
    };

    let body = DecisionResponse {
        path,
        decision,
        location: location.clone(),
    };

    match location {
        None => (status, Json(body)).into_response(),
        Some(location) => (status, [(header::LOCATION, location)], Json(body)).into_response(),
    }
}

/// Query part of a target with any fragment removed.
fn path_of_query(rest: &str) -> &str {
    rest.split('#').next().unwrap_or_default()
}

/// get_session
///
/// [Gated Route] Returns what the gate verified about the caller: role, subject, email and
/// token expiry.
#[utoipa::path(
    get,
    path = "/profile/session",
    responses(
        (status = 200, description = "Verified session", body = SessionView),
        (status = 303, description = "No valid session, redirected to login")
    )
)]
pub async fn get_session(user: AuthUser) -> Json<SessionView> {
    Json(SessionView::from(user))
}
