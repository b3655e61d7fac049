//! Integration tests for HarvestHub.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p harvesthub-cli -- migrate run
//!
//! # Start the API with rate limiting off (the lockout scenario fires more
//! # requests per minute than the auth budget allows)
//! RATE_LIMIT_ENABLED=false cargo run -p harvesthub-api
//!
//! # Run integration tests (ignored by default)
//! cargo test -p harvesthub-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - Registration, login, lockout, and password change
//!   scenarios against a running server
//!
//! Tests are `#[ignore]`d so `cargo test` stays green without a running
//! server; the base URL comes from `API_BASE_URL` (default
//! `http://localhost:5000`).

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Create an HTTP client with a cookie store, so the session cookie set at
/// login flows into subsequent requests.
///
/// # Panics
///
/// Panics if the client cannot be constructed.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}
