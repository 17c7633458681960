use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Identity Schemas ---

/// Role
///
/// The fixed set of access levels an issued session may carry. The wire names are the
/// ones the identity service writes into the `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    /// Student.
    Siswa,
    /// Teacher.
    Guru,
    Admin,
}

impl Role {
    /// Parses the raw `role` claim. Anything outside the enumeration yields `None`.
    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "siswa" => Some(Role::Siswa),
            "guru" => Some(Role::Guru),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Siswa => "siswa",
            Role::Guru => "guru",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims
///
/// The payload the identity service signs into the access-token cookie.
/// `role` stays a plain string on the wire so an unknown value can be told apart from a
/// malformed token; it is narrowed to [`Role`] after the signature checks out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id assigned by the identity service, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// The RBAC field: 'siswa', 'guru' or 'admin'.
    pub role: String,
    /// Expiration Time (exp), seconds since the Unix epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the Unix epoch.
    pub iat: usize,
}

// --- Gate Output ---

/// AccessDecision
///
/// Result of evaluating one request against the route classification.
/// Computed fresh per request and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AccessDecision {
    /// Proceed to the requested resource.
    Allow,
    /// No usable credential: send the visitor to the login page.
    RedirectLogin,
    /// Valid credential whose role does not satisfy the route.
    RedirectUnauthorized,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// DecisionResponse
///
/// Body returned by the forward-auth endpoint (GET /gate/check).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DecisionResponse {
    /// The normalized path the decision was made for.
    pub path: String,
    pub decision: AccessDecision,
    /// Redirect target; absent when the decision is `allow`.
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// SessionView
///
/// What the gate verified about the caller, served at GET /profile/session.
/// Never includes the raw token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionView {
    pub role: Role,
    pub subject: Option<String>,
    pub email: Option<String>,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}
