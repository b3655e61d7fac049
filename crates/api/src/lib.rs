//! HarvestHub API library.
//!
//! This crate provides the backend functionality as a library, allowing it
//! to be tested and reused. The binary in `main.rs` wires configuration,
//! tracing, Sentry, and the router together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AppConfig;
use crate::state::AppState;

/// Build the full application router over the given state.
///
/// Includes health endpoints, all `/api` routes, and the middleware stack
/// that does not depend on the listener (CORS, security headers, request
/// ID, tracing).
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config());
    let api_routes = routes::routes(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(api_routes)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the browser frontend: configured origin plus the local dev
/// servers, credentialed so the session cookie flows.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let mut origins = vec![
        "http://localhost:5173",
        "http://localhost:5174",
        "http://localhost:3000",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok())
    .collect::<Vec<_>>();

    if let Ok(frontend) = config.frontend_url.parse::<axum::http::HeaderValue>() {
        origins.push(frontend);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

/// Liveness health check endpoint.
///
/// Returns a JSON heartbeat if the server is running. Does not check
/// dependencies.
async fn health() -> impl axum::response::IntoResponse {
    Json(json!({
        "success": true,
        "message": "HarvestHub API is running!",
    }))
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
