use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use thiserror::Error;

use crate::{
    config::{ConfigError, JwtSettings},
    models::{Claims, Role, SessionView},
};

/// VerifyError
///
/// Why a presented credential was rejected. The messages name the failure class only;
/// they never contain token text or key material, so they are safe to log.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("token expired")]
    Expired,
    #[error("signature does not verify")]
    InvalidSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("role claim is not a known role")]
    UnknownRole,
    /// Issuer, audience, not-before or algorithm constraints failed.
    #[error("token rejected: {0}")]
    Rejected(&'static str),
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => VerifyError::Malformed,
            ErrorKind::InvalidIssuer => VerifyError::Rejected("issuer"),
            ErrorKind::InvalidAudience => VerifyError::Rejected("audience"),
            ErrorKind::ImmatureSignature => VerifyError::Rejected("not yet valid"),
            ErrorKind::InvalidAlgorithm => VerifyError::Rejected("algorithm"),
            _ => VerifyError::Rejected("verification"),
        }
    }
}

/// TokenVerifier
///
/// Holds the decoding key and validation rules, both built once from [`JwtSettings`] so
/// that evaluation never reads configuration.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(settings: &JwtSettings) -> Result<Self, ConfigError> {
        if settings.secret.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        let mut validation = Validation::new(settings.algorithm);
        // `exp` is required and always checked; `nbf` is checked when present.
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = settings.leeway_secs;

        // A configured audience or issuer must also be present in the token.
        let mut required = vec!["exp"];
        match &settings.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                required.push("aud");
            }
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &settings.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        validation.set_required_spec_claims(&required);

        Ok(Self {
            key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
        })
    }

    /// Checks signature, expiry and the configured constraints, then narrows the role claim.
    pub fn verify(&self, token: &str) -> Result<AuthUser, VerifyError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)?;
        let claims = token_data.claims;

        let role = Role::from_claim(&claims.role).ok_or(VerifyError::UnknownRole)?;
        let expires_at = i64::try_from(claims.exp)
            .ok()
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
            .ok_or(VerifyError::Malformed)?;

        Ok(AuthUser {
            subject: claims.sub,
            email: claims.email,
            role,
            expires_at,
        })
    }
}

/// token_from_cookies
///
/// Finds the named cookie across every `Cookie` header. Empty values are skipped, so a
/// cleared cookie does not hide a live one of the same name.
pub fn token_from_cookies<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .find(|value| !value.is_empty())
}

/// AuthUser
///
/// The verified session of the current request. The gate middleware attaches it to the
/// request extensions after a successful evaluation; handlers take it as an argument.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl From<AuthUser> for SessionView {
    fn from(user: AuthUser) -> Self {
        SessionView {
            role: user.role,
            subject: user.subject,
            email: user.email,
            expires_at: user.expires_at,
        }
    }
}

/// Rejection: 401 when the route was not placed behind the gate middleware, or the gate
/// allowed the request without verifying a credential (public or bypassed path).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
