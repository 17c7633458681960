use jsonwebtoken::Algorithm;
use std::{env, fmt};
use thiserror::Error;

use crate::policy::UnmatchedPathPolicy;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// ConfigError
///
/// Raised while loading configuration or assembling the gate. The binary refuses to start
/// on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("redirect target '{0}' is itself behind the gate")]
    RedirectLoop(String),
    #[error("JWT secret must not be empty")]
    EmptySecret,
}

/// AppConfig
///
/// Immutable once loaded; shared with handlers and the gate through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects the log format and whether the secret is mandatory.
    pub env: Env,
    // Socket address the HTTP server listens on.
    pub bind_addr: String,
    pub jwt: JwtSettings,
    pub gate: GateSettings,
}

/// Env
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// JwtSettings
///
/// Everything needed to verify an access token. The secret is shared out-of-band with the
/// identity service and is redacted from `Debug` output.
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub algorithm: Algorithm,
    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    pub leeway_secs: u64,
    pub audience: Option<String>,
    pub issuer: Option<String>,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("leeway_secs", &self.leeway_secs)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// GateSettings
///
/// Cookie name, redirect destinations and the fallthrough policy.
#[derive(Clone, Debug)]
pub struct GateSettings {
    pub cookie_name: String,
    pub login_path: String,
    pub unauthorized_path: String,
    /// When set, login redirects carry the requested path under this query parameter.
    pub login_return_param: Option<String>,
    pub unmatched_policy: UnmatchedPathPolicy,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: LOCAL_JWT_SECRET.to_string(),
            algorithm: Algorithm::HS256,
            leeway_secs: 0,
            audience: None,
            issuer: None,
        }
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            cookie_name: "access_token".to_string(),
            login_path: "/login".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
            login_return_param: None,
            unmatched_policy: UnmatchedPathPolicy::default(),
        }
    }
}

impl Default for AppConfig {
    /// Safe values for tests; no environment access.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            jwt: JwtSettings::default(),
            gate: GateSettings::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment at startup.
    /// In production the JWT secret is mandatory; locally a development secret is used when
    /// `GATE_JWT_SECRET` is absent.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let secret = match (env::var("GATE_JWT_SECRET"), &env) {
            (Ok(secret), _) => secret,
            (Err(_), Env::Production) => return Err(ConfigError::Missing("GATE_JWT_SECRET")),
            (Err(_), Env::Local) => LOCAL_JWT_SECRET.to_string(),
        };
        if secret.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        let algorithm = parse_algorithm(&var_or("GATE_JWT_ALGORITHM", "HS256"))?;

        let leeway_secs = var_or("GATE_JWT_LEEWAY_SECS", "0")
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid {
                var: "GATE_JWT_LEEWAY_SECS",
                reason: e.to_string(),
            })?;

        let unmatched_policy =
            var_or("GATE_UNMATCHED_POLICY", "allow-authenticated").parse::<UnmatchedPathPolicy>()?;

        Ok(Self {
            env,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
            jwt: JwtSettings {
                secret,
                algorithm,
                leeway_secs,
                audience: optional_var("GATE_JWT_AUDIENCE"),
                issuer: optional_var("GATE_JWT_ISSUER"),
            },
            gate: GateSettings {
                cookie_name: var_or("GATE_COOKIE_NAME", "access_token"),
                login_path: var_or("GATE_LOGIN_PATH", "/login"),
                unauthorized_path: var_or("GATE_UNAUTHORIZED_PATH", "/unauthorized"),
                login_return_param: optional_var("GATE_LOGIN_RETURN_PARAM"),
                unmatched_policy,
            },
        })
    }
}

/// Only the HMAC family is accepted: the key is a shared symmetric secret.
fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    match value {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::Invalid {
            var: "GATE_JWT_ALGORITHM",
            reason: format!("'{other}' is not an HMAC algorithm"),
        }),
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
