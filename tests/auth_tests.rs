mod common;

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request, StatusCode, header, request::Parts},
};
use common::*;
use edu_portal_gate::{
    Role,
    auth::{AuthUser, TokenVerifier, VerifyError, token_from_cookies},
    config::JwtSettings,
    models::SessionView,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;

fn verifier() -> TokenVerifier {
    TokenVerifier::new(&jwt_settings()).unwrap()
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: &str) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

// --- Verifier ---

#[test]
fn test_verify_success_narrows_role() {
    let user = verifier().verify(&token_for("guru")).unwrap();
    assert_eq!(user.role, Role::Guru);
    assert_eq!(user.email.as_deref(), Some("murid@sekolah.id"));
    assert!(user.expires_at > chrono::Utc::now());
}

#[test]
fn test_verify_classifies_failures() {
    let v = verifier();
    assert_eq!(v.verify(&expired_token_for("siswa")).unwrap_err(), VerifyError::Expired);
    assert_eq!(
        v.verify(&sign(&claims("siswa", now() + 60), OTHER_SECRET)).unwrap_err(),
        VerifyError::InvalidSignature
    );
    assert_eq!(v.verify("abc.def").unwrap_err(), VerifyError::Malformed);
    assert_eq!(v.verify(&token_for("superuser")).unwrap_err(), VerifyError::UnknownRole);
}

#[test]
fn test_verify_requires_role_and_exp() {
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    let no_role = encode(
        &Header::default(),
        &json!({ "exp": now() + 60, "iat": now() }),
        &key,
    )
    .unwrap();
    let no_exp = encode(&Header::default(), &json!({ "role": "admin", "iat": now() }), &key).unwrap();

    assert_eq!(verifier().verify(&no_role).unwrap_err(), VerifyError::Malformed);
    assert_eq!(verifier().verify(&no_exp).unwrap_err(), VerifyError::Malformed);
}

#[test]
fn test_verify_rejects_other_algorithm() {
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims("admin", now() + 60),
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();
    assert!(matches!(verifier().verify(&token), Err(VerifyError::Rejected(_))));
}

#[test]
fn test_verify_checks_configured_audience() {
    let settings = JwtSettings {
        audience: Some("portal".to_string()),
        ..jwt_settings()
    };
    let v = TokenVerifier::new(&settings).unwrap();

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    let with_aud = |aud: &str| {
        encode(
            &Header::default(),
            &json!({ "role": "siswa", "exp": now() + 60, "iat": now(), "aud": aud }),
            &key,
        )
        .unwrap()
    };

    assert!(v.verify(&with_aud("portal")).is_ok());
    assert_eq!(
        v.verify(&with_aud("billing")).unwrap_err(),
        VerifyError::Rejected("audience")
    );
    assert_eq!(v.verify(&token_for("siswa")).unwrap_err(), VerifyError::Malformed);
}

#[test]
fn test_verify_checks_configured_issuer() {
    let settings = JwtSettings {
        issuer: Some("https://auth.sekolah.id".to_string()),
        ..jwt_settings()
    };
    let v = TokenVerifier::new(&settings).unwrap();

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    let with_iss = |iss: &str| {
        encode(
            &Header::default(),
            &json!({ "role": "guru", "exp": now() + 60, "iat": now(), "iss": iss }),
            &key,
        )
        .unwrap()
    };

    assert_eq!(v.verify(&with_iss("https://auth.sekolah.id")).unwrap().role, Role::Guru);
    assert_eq!(
        v.verify(&with_iss("https://evil.example")).unwrap_err(),
        VerifyError::Rejected("issuer")
    );
    // Once an issuer is configured, a token without `iss` is not accepted.
    assert_eq!(v.verify(&token_for("guru")).unwrap_err(), VerifyError::Malformed);
}

#[test]
fn test_verify_error_messages_do_not_leak_token() {
    let token = sign(&claims("admin", now() + 60), OTHER_SECRET);
    let message = verifier().verify(&token).unwrap_err().to_string();
    assert!(!message.contains(&token));
    assert!(!message.contains(TEST_JWT_SECRET));
}

#[test]
fn test_jwt_settings_debug_redacts_secret() {
    let rendered = format!("{:?}", jwt_settings());
    assert!(!rendered.contains(TEST_JWT_SECRET));
    assert!(rendered.contains("<redacted>"));
}

// --- Cookies ---

#[test]
fn test_token_from_cookies_finds_named_cookie() {
    let mut parts = get_request_parts(Method::GET, "/");
    parts.headers.insert(
        header::COOKIE,
        HeaderValue::from_static("theme=dark; access_token=abc.def.ghi; lang=id"),
    );
    assert_eq!(token_from_cookies(&parts.headers, "access_token"), Some("abc.def.ghi"));
    assert_eq!(token_from_cookies(&parts.headers, "session"), None);
}

#[test]
fn test_token_from_cookies_scans_every_header_and_ignores_empty() {
    let mut parts = get_request_parts(Method::GET, "/");
    parts.headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
    parts.headers.append(header::COOKIE, HeaderValue::from_static("access_token=\"xyz\""));
    assert_eq!(token_from_cookies(&parts.headers, "access_token"), Some("xyz"));

    let mut empty = get_request_parts(Method::GET, "/");
    empty.headers.insert(header::COOKIE, HeaderValue::from_static("access_token="));
    assert_eq!(token_from_cookies(&empty.headers, "access_token"), None);
}

#[test]
fn test_cleared_cookie_does_not_hide_live_one() {
    let mut parts = get_request_parts(Method::GET, "/");
    parts.headers.insert(
        header::COOKIE,
        HeaderValue::from_static("access_token=; theme=dark; access_token=live.jwt.value"),
    );
    assert_eq!(token_from_cookies(&parts.headers, "access_token"), Some("live.jwt.value"));

    let mut split = get_request_parts(Method::GET, "/");
    split.headers.append(header::COOKIE, HeaderValue::from_static("access_token=\"\""));
    split.headers.append(header::COOKIE, HeaderValue::from_static("access_token=second"));
    assert_eq!(token_from_cookies(&split.headers, "access_token"), Some("second"));
}

// --- Extractor ---

#[tokio::test]
async fn test_auth_user_extractor_reads_extension() {
    let user = verifier().verify(&token_for("siswa")).unwrap();
    let mut parts = get_request_parts(Method::GET, "/profile/session");
    parts.extensions.insert(user);

    let extracted = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(extracted.role, Role::Siswa);

    let view = SessionView::from(extracted);
    assert_eq!(view.subject.as_deref(), Some("user-42"));
}

#[tokio::test]
async fn test_auth_user_extractor_rejects_without_session() {
    let mut parts = get_request_parts(Method::GET, "/profile/session");
    let result = AuthUser::from_request_parts(&mut parts, &()).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}
