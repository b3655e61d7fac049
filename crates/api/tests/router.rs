//! Router-level tests.
//!
//! These exercise request paths that terminate before touching the database:
//! health, session-extraction failures, gateway capability checks, and the
//! logout cookie. The pool is lazy, so no `PostgreSQL` instance is needed.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use tower::ServiceExt;

use harvesthub_api::app;
use harvesthub_api::config::{
    AppConfig, Environment, JwtConfig, LockoutConfig, PaymentsConfig,
};
use harvesthub_api::db::create_lazy_pool;
use harvesthub_api::services::auth::token::TokenIssuer;
use harvesthub_api::state::AppState;

use harvesthub_core::{Email, Role, UserId};

const TEST_SECRET: &str = "kX9#mP2$vL8@qR5!wT3^zB7&nC4*hJ6%";

fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://localhost:1/harvesthub_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 5000,
        environment: Environment::Development,
        frontend_url: "http://localhost:5173".to_owned(),
        jwt: JwtConfig {
            secret: SecretString::from(TEST_SECRET),
            lifetime_days: 30,
            cookie_lifetime_days: 30,
        },
        lockout: LockoutConfig::default(),
        rate_limit_enabled: true,
        email: None,
        payments: PaymentsConfig::default(),
        sentry_dsn: None,
    }
}

fn test_app() -> axum::Router {
    let config = test_config();
    let pool = create_lazy_pool(&config.database_url).unwrap();
    let state = AppState::new(config, pool).unwrap();
    app(state)
}

/// Build a request with the forwarding header the rate limiter keys on.
fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_heartbeat() {
    let response = test_app()
        .oneshot(request("GET", "/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn me_without_token_is_unauthenticated() {
    let response = test_app()
        .oneshot(request("GET", "/api/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized to access this route");
}

#[tokio::test]
async fn me_with_malformed_token_reports_invalid() {
    let response = test_app()
        .oneshot(
            request("GET", "/api/auth/me")
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn me_with_expired_token_reports_expired() {
    let issuer = TokenIssuer::new(&SecretString::from(TEST_SECRET), 30);
    let email = Email::parse("shopper@example.com").unwrap();
    let stale = issuer
        .issue_at(
            UserId::new(1),
            &email,
            Role::User,
            Utc::now() - Duration::days(31),
        )
        .unwrap();

    let response = test_app()
        .oneshot(
            request("GET", "/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {stale}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn expired_token_in_cookie_is_also_rejected() {
    let issuer = TokenIssuer::new(&SecretString::from(TEST_SECRET), 30);
    let email = Email::parse("shopper@example.com").unwrap();
    let stale = issuer
        .issue_at(
            UserId::new(1),
            &email,
            Role::User,
            Utc::now() - Duration::days(31),
        )
        .unwrap();

    let response = test_app()
        .oneshot(
            request("GET", "/api/auth/me")
                .header(header::COOKIE, format!("token={stale}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn logout_clears_session_cookie() {
    let response = test_app()
        .oneshot(request("POST", "/api/auth/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(set_cookie.starts_with("token=;"));
    assert!(set_cookie.contains("Max-Age=0"));

    let body = body_json(response).await;
    assert_eq!(body["message"], "User logged out successfully");
}

#[tokio::test]
async fn payments_config_reports_unconfigured_gateways() {
    let response = test_app()
        .oneshot(
            request("GET", "/api/payments/config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["gateways"]["razorpay"], false);
    assert_eq!(body["data"]["gateways"]["stripe"], false);
}

#[tokio::test]
async fn security_headers_are_applied() {
    let response = test_app()
        .oneshot(request("GET", "/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("cache-control").unwrap(), "no-store, max-age=0");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn verify_email_route_is_public_but_envelope_shaped() {
    // The handler needs the database, so a lazy pool makes it fail with a
    // 500 envelope rather than a 401 - the route itself must not require a
    // session.
    let response = test_app()
        .oneshot(
            request("GET", "/api/auth/verify-email/deadbeef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}
