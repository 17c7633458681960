use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::{
    auth::{AuthUser, TokenVerifier, token_from_cookies},
    config::{AppConfig, ConfigError, GateSettings, JwtSettings},
    models::AccessDecision,
    policy::{RouteTable, UnmatchedPathPolicy, canonical_path, normalize_path},
};

/// Shared handle used as middleware state.
pub type GateState = Arc<AccessGate>;

/// Evaluation
///
/// A decision plus, when a credential was verified on the way, the session it belongs to.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub decision: AccessDecision,
    pub session: Option<AuthUser>,
}

impl Evaluation {
    fn bare(decision: AccessDecision) -> Self {
        Self {
            decision,
            session: None,
        }
    }
}

/// AccessGate
///
/// The single authorization checkpoint in front of the portal's pages.
/// Built once at startup from injected settings; evaluation is a pure function of
/// (path, credential) and holds no mutable state.
pub struct AccessGate {
    verifier: TokenVerifier,
    routes: RouteTable,
    settings: GateSettings,
}

impl AccessGate {
    /// Assembles the gate. Fails if the secret is empty or if either redirect target would
    /// itself demand a credential, which would send visitors round in circles.
    pub fn new(
        jwt: &JwtSettings,
        settings: GateSettings,
        routes: RouteTable,
    ) -> Result<Self, ConfigError> {
        for target in [&settings.login_path, &settings.unauthorized_path] {
            if routes.requires_credential(target) {
                return Err(ConfigError::RedirectLoop(target.clone()));
            }
        }

        Ok(Self {
            verifier: TokenVerifier::new(jwt)?,
            routes,
            settings,
        })
    }

    /// Builds the gate with the portal's default route table and the configured policy.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let routes = RouteTable::default().with_unmatched_policy(config.gate.unmatched_policy);
        Self::new(&config.jwt, config.gate.clone(), routes)
    }

    pub fn cookie_name(&self) -> &str {
        &self.settings.cookie_name
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The decision alone, for callers that do not need the verified session.
    pub fn evaluate(&self, path: &str, credential: Option<&str>) -> AccessDecision {
        self.check(path, credential).decision
    }

    /// check
    ///
    /// Steps run in a fixed order and the first one that decides wins:
    /// 1. paths outside the matcher bypass the gate;
    /// 2. public paths are allowed without looking at the credential;
    /// 3. a missing credential redirects to login;
    /// 4. a credential that fails verification redirects to login;
    /// 5. the role claim is matched against the role table, falling back to the
    ///    unmatched-path policy when no rule covers the path.
    pub fn check(&self, path: &str, credential: Option<&str>) -> Evaluation {
        let path = normalize_path(path);

        if !self.routes.intercepts(&path) || self.routes.is_public(&path) {
            return Evaluation::bare(AccessDecision::Allow);
        }

        let Some(token) = credential.filter(|token| !token.is_empty()) else {
            tracing::debug!(path = %path, "no session credential");
            return Evaluation::bare(AccessDecision::RedirectLogin);
        };

        let user = match self.verifier.verify(token) {
            Ok(user) => user,
            Err(reason) => {
                tracing::warn!(path = %path, reason = %reason, "session credential rejected");
                return Evaluation::bare(AccessDecision::RedirectLogin);
            }
        };

        let decision = match self.routes.required_role(&path) {
            Some(required) if required == user.role => AccessDecision::Allow,
            Some(required) => {
                tracing::info!(
                    path = %path,
                    role = %user.role,
                    required = %required,
                    "role does not satisfy route"
                );
                AccessDecision::RedirectUnauthorized
            }
            None => match self.routes.unmatched {
                UnmatchedPathPolicy::AllowAuthenticated => AccessDecision::Allow,
                UnmatchedPathPolicy::DenyUnlisted => {
                    tracing::info!(path = %path, role = %user.role, "no role rule covers path");
                    AccessDecision::RedirectUnauthorized
                }
            },
        };

        Evaluation {
            decision,
            session: decision.is_allowed().then_some(user),
        }
    }

    /// redirect_location
    ///
    /// Where a denied request is sent. `requested` is echoed back to the login page when a
    /// return parameter is configured.
    pub fn redirect_location(&self, decision: AccessDecision, requested: &str) -> Option<String> {
        match decision {
            AccessDecision::Allow => None,
            AccessDecision::RedirectUnauthorized => Some(self.settings.unauthorized_path.clone()),
            AccessDecision::RedirectLogin => Some(match &self.settings.login_return_param {
                Some(param) => format!(
                    "{}?{}={}",
                    self.settings.login_path,
                    param,
                    urlencoding::encode(&normalize_path(requested))
                ),
                None => self.settings.login_path.clone(),
            }),
        }
    }

    /// dispose
    ///
    /// What to do with a raw request path. Denials win first so that nothing is forwarded
    /// without a decision; an allowed path is only forwarded in its canonical spelling,
    /// since downstream routing sees the raw path and not the one that was classified.
    /// `query` is carried over to the canonical location.
    pub fn dispose(&self, raw_path: &str, query: Option<&str>, credential: Option<&str>) -> Disposition {
        let evaluation = self.check(raw_path, credential);

        if let Some(location) = self.redirect_location(evaluation.decision, raw_path) {
            return Disposition::Deny {
                decision: evaluation.decision,
                location,
            };
        }

        let canonical = canonical_path(raw_path);
        let intercepted =
            self.routes.intercepts(raw_path) || self.routes.intercepts(&normalize_path(raw_path));
        if canonical != raw_path && intercepted {
            tracing::debug!(raw = %raw_path, canonical = %canonical, "non-canonical path");
            let location = match query {
                Some(query) => format!("{canonical}?{query}"),
                None => canonical,
            };
            return Disposition::Canonicalize { location };
        }

        Disposition::Forward {
            session: evaluation.session,
        }
    }
}

/// Disposition
///
/// The gate's answer for one raw request path.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// Allowed and already canonical: pass the request on.
    Forward { session: Option<AuthUser> },
    /// Login or unauthorized redirect.
    Deny {
        decision: AccessDecision,
        location: String,
    },
    /// Allowed, but only under its canonical spelling.
    Canonicalize { location: String },
}

/// access_gate
///
/// Middleware form of the gate, installed with `middleware::from_fn_with_state`.
/// Allowed requests continue with the verified [`AuthUser`] in their extensions; denied
/// ones are answered with a `303 See Other` to the login or unauthorized page, and
/// non-canonical spellings with a `307 Temporary Redirect` to the canonical path.
pub async fn access_gate(State(gate): State<GateState>, mut request: Request, next: Next) -> Response {
    let credential = token_from_cookies(request.headers(), gate.cookie_name()).map(str::to_owned);
    let uri = request.uri();

    match gate.dispose(uri.path(), uri.query(), credential.as_deref()) {
        Disposition::Forward { session } => {
            if let Some(user) = session {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        Disposition::Deny { location, .. } => Redirect::to(&location).into_response(),
        Disposition::Canonicalize { location } => Redirect::temporary(&location).into_response(),
    }
}
