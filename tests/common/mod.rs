#![allow(dead_code)]

use edu_portal_gate::{
    AccessGate,
    config::{GateSettings, JwtSettings},
    models::Claims,
    policy::RouteTable,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::SystemTime;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
pub const OTHER_SECRET: &str = "some-other-secret-entirely";

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn claims(role: &str, exp: u64) -> Claims {
    Claims {
        sub: Some("user-42".to_string()),
        email: Some("murid@sekolah.id".to_string()),
        role: role.to_string(),
        iat: now() as usize,
        exp: exp as usize,
    }
}

pub fn sign(claims: &Claims, secret: &str) -> String {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &key).unwrap()
}

/// Valid for an hour, signed with the test secret.
pub fn token_for(role: &str) -> String {
    sign(&claims(role, now() + 3600), TEST_JWT_SECRET)
}

/// Correct signature, expiry two minutes in the past.
pub fn expired_token_for(role: &str) -> String {
    sign(&claims(role, now() - 120), TEST_JWT_SECRET)
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: TEST_JWT_SECRET.to_string(),
        ..JwtSettings::default()
    }
}

pub fn gate_with(settings: GateSettings, routes: RouteTable) -> AccessGate {
    AccessGate::new(&jwt_settings(), settings, routes).unwrap()
}

pub fn default_gate() -> AccessGate {
    gate_with(GateSettings::default(), RouteTable::default())
}
