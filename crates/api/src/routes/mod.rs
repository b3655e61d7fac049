//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database ping)
//!
//! # Auth
//! POST /api/auth/register       - Create an account (rate limited)
//! POST /api/auth/login          - Authenticate (rate limited)
//! POST /api/auth/logout         - Clear the session cookie
//! GET  /api/auth/me             - Current principal + addresses/cart/wishlist
//! POST /api/auth/refresh-token  - Mint a fresh session token
//! GET  /api/auth/verify-email/{token}   - Consume a verification token
//! POST /api/auth/resend-verification    - Re-send the verification email
//! POST /api/auth/forgot-password        - Start a password reset (rate limited)
//! PUT  /api/auth/reset-password/{token} - Consume a reset token (rate limited)
//! PUT  /api/auth/update-password        - Change password (authenticated)
//! PUT  /api/auth/profile                - Update profile fields
//!
//! # Users (admin unless noted)
//! GET    /api/users                     - List accounts
//! GET    /api/users/{id}                - Fetch one (admin or self)
//! PUT    /api/users/{id}                - Change role / active flag
//! DELETE /api/users/{id}                - Delete an account
//! POST   /api/users/{id}/addresses      - Add a saved address (self)
//! PUT    /api/users/{id}/addresses/{aid}    - Update a saved address (self)
//! DELETE /api/users/{id}/addresses/{aid}    - Delete a saved address (self)
//!
//! # Payments
//! GET  /api/payments/config                  - Gateway availability
//! POST /api/payments/razorpay/create-order   - Create a Razorpay order
//! POST /api/payments/razorpay/verify         - Verify a checkout signature
//! POST /api/payments/stripe/create-intent    - Create a Stripe intent
//! ```

pub mod auth;
pub mod payments;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::config::AppConfig;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
///
/// Credential-sensitive endpoints carry the strict rate limiter when rate
/// limiting is enabled.
pub fn auth_routes(config: &AppConfig) -> Router<AppState> {
    let sensitive = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/{token}", put(auth::reset_password));
    let sensitive = if config.rate_limit_enabled {
        sensitive.layer(auth_rate_limiter())
    } else {
        sensitive
    };

    Router::new()
        .merge(sensitive)
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/verify-email/{token}", get(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/update-password", put(auth::update_password))
        .route("/profile", put(auth::update_profile))
}

/// Create the user administration routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/{id}/addresses", post(users::add_address))
        .route(
            "/{id}/addresses/{address_id}",
            put(users::update_address).delete(users::delete_address),
        )
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/config", get(payments::gateway_config))
        .route(
            "/razorpay/create-order",
            post(payments::create_razorpay_order),
        )
        .route("/razorpay/verify", post(payments::verify_razorpay_payment))
        .route("/stripe/create-intent", post(payments::create_stripe_intent))
}

/// Create all API routes, with the general rate limiter applied.
pub fn routes(config: &AppConfig) -> Router<AppState> {
    let router = Router::new()
        .nest("/api/auth", auth_routes(config))
        .nest("/api/users", user_routes())
        .nest("/api/payments", payment_routes());

    if config.rate_limit_enabled {
        router.layer(api_rate_limiter())
    } else {
        router
    }
}
