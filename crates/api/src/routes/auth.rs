//! Authentication route handlers.
//!
//! Handles registration, login, logout, session refresh, email verification,
//! and password reset/change. Responses use the standard JSON envelope; the
//! session token travels both in the body and in an `HttpOnly` cookie.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::config::AppConfig;
use crate::db::users::UserRepository;
use crate::error::{ApiError, Result};
use crate::middleware::{RequireAuth, TOKEN_COOKIE};
use crate::models::user::Account;
use crate::services::auth::{AuthService, EmailOutcome, NewRegistration, ProfileUpdate};
use crate::state::AppState;

// =============================================================================
// Request bodies
// =============================================================================

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// Forgot-password request.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub email: String,
}

/// Reset-password request.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub password: String,
}

/// Update-password request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordBody {
    pub current_password: String,
    pub new_password: String,
}

/// Profile update request.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse> {
    let service = AuthService::new(&state);
    let (account, outcome) = service
        .register(&NewRegistration {
            name: body.name,
            email: body.email,
            password: body.password,
            phone: body.phone,
        })
        .await?;

    let message = match outcome {
        EmailOutcome::Sent => {
            "User registered successfully. Please check your email to verify your account."
        }
        EmailOutcome::Failed => "User registered successfully. Verification email could not be sent.",
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": message,
            "data": { "user": account.summary() },
        })),
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Response> {
    if body.email.trim().is_empty() {
        return Err(ApiError::Validation("Email is required".to_owned()));
    }
    if body.password.is_empty() {
        return Err(ApiError::Validation("Password is required".to_owned()));
    }

    let service = AuthService::new(&state);
    let account = service.login(&body.email, &body.password, Utc::now()).await?;
    let token = service.issue_session(&account)?;

    Ok(token_response(StatusCode::OK, &token, &account, state.config()))
}

/// `POST /api/auth/logout`
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({
            "success": true,
            "message": "User logged out successfully",
        })),
    )
}

/// `GET /api/auth/me`
///
/// Returns the principal with saved addresses, cart, and wishlist populated.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let addresses = users.addresses(account.id).await?;
    let cart = users.cart_items(account.id).await?;
    let wishlist = users.wishlist(account.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OK",
        "data": {
            "user": account.summary(),
            "addresses": addresses,
            "cart": cart,
            "wishlist": wishlist,
        },
    })))
}

/// `POST /api/auth/refresh-token`
pub async fn refresh_token(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
) -> Result<Response> {
    let service = AuthService::new(&state);
    let token = service.issue_session(&account)?;
    Ok(token_response(StatusCode::OK, &token, &account, state.config()))
}

/// `GET /api/auth/verify-email/{token}`
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse> {
    let service = AuthService::new(&state);
    service.verify_email(&token).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Email verified successfully",
    })))
}

/// `POST /api/auth/resend-verification`
pub async fn resend_verification(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
) -> Result<impl IntoResponse> {
    let service = AuthService::new(&state);
    service.resend_verification(&account).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Verification email sent successfully",
    })))
}

/// `POST /api/auth/forgot-password`
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordBody>,
) -> Result<impl IntoResponse> {
    if body.email.trim().is_empty() {
        return Err(ApiError::Validation("Email is required".to_owned()));
    }

    let service = AuthService::new(&state);
    service.forgot_password(&body.email).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset email sent successfully",
    })))
}

/// `PUT /api/auth/reset-password/{resetToken}`
///
/// A consumed token logs the account in: the response carries a fresh
/// session.
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Response> {
    let service = AuthService::new(&state);
    let account = service.reset_password(&reset_token, &body.password).await?;
    let token = service.issue_session(&account)?;

    Ok(token_response(StatusCode::OK, &token, &account, state.config()))
}

/// `PUT /api/auth/update-password`
pub async fn update_password(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Json(body): Json<UpdatePasswordBody>,
) -> Result<Response> {
    let service = AuthService::new(&state);
    service
        .update_password(&account, &body.current_password, &body.new_password)
        .await?;
    let token = service.issue_session(&account)?;

    Ok(token_response(StatusCode::OK, &token, &account, state.config()))
}

/// `PUT /api/auth/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Json(body): Json<UpdateProfileBody>,
) -> Result<impl IntoResponse> {
    let service = AuthService::new(&state);
    let updated = service
        .update_profile(
            &account,
            ProfileUpdate {
                name: body.name,
                email: body.email,
                phone: body.phone,
                address: body.address,
            },
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": { "user": updated.summary() },
    })))
}

// =============================================================================
// Session cookie helpers
// =============================================================================

/// Build the success response that carries a session: `token` cookie plus
/// the token and user summary in the body.
fn token_response(
    status: StatusCode,
    token: &str,
    account: &Account,
    config: &AppConfig,
) -> Response {
    let message = if status == StatusCode::OK {
        "Login successful"
    } else {
        "Operation successful"
    };

    (
        status,
        [(header::SET_COOKIE, session_cookie(token, config))],
        Json(json!({
            "success": true,
            "message": message,
            "data": {
                "token": token,
                "user": account.summary(),
            },
        })),
    )
        .into_response()
}

/// Build the `Set-Cookie` value for a session token.
///
/// `HttpOnly` and `SameSite=Strict` always; `Secure` in production. The
/// cookie lifetime mirrors the configured cookie lifetime in days.
fn session_cookie(token: &str, config: &AppConfig) -> String {
    let max_age_secs = config.jwt.cookie_lifetime_days * 24 * 60 * 60;
    let mut cookie = format!(
        "{TOKEN_COOKIE}={token}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Strict"
    );
    if config.environment.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the `Set-Cookie` value that clears the session cookie.
fn clear_session_cookie() -> String {
    format!("{TOKEN_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    use crate::config::{Environment, JwtConfig, LockoutConfig, PaymentsConfig};

    fn config(environment: Environment) -> AppConfig {
        AppConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            environment,
            frontend_url: "http://localhost:5173".to_owned(),
            jwt: JwtConfig {
                secret: SecretString::from("x".repeat(32)),
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

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc.def.ghi", &config(Environment::Development));
        assert!(cookie.starts_with("token=abc.def.ghi; "));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_secure_in_production() {
        let cookie = session_cookie("abc", &config(Environment::Production));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
