//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ApiError` type that maps every expected failure to a
//! status code and a client-facing message inside the standard JSON envelope
//! (`{"success": false, "message": ...}`), and captures server-class errors
//! to Sentry before responding. All route handlers return
//! `Result<T, ApiError>`.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use harvesthub_core::Role;

use crate::db::RepositoryError;
use crate::payments::GatewayError;
use crate::services::auth::AuthError;
use crate::services::auth::token::TokenError;

/// Whether responses may carry underlying error detail. Enabled outside
/// production; flipped once at startup.
static EXPOSE_ERROR_DETAILS: AtomicBool = AtomicBool::new(true);

/// Set whether 5xx responses include the underlying error message.
pub fn set_expose_error_details(expose: bool) {
    EXPOSE_ERROR_DETAILS.store(expose, Ordering::Relaxed);
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request input failed validation; never reaches core logic.
    #[error("{0}")]
    Validation(String),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// No usable credential on the request, or the principal check failed.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// Authenticated, but the principal's role is not permitted.
    #[error("User role '{0}' is not authorized to access this route")]
    Forbidden(Role),

    /// Authenticated, but the principal does not own the resource.
    #[error("Not authorized to access this resource")]
    NotOwner,

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// A payment gateway is not configured.
    #[error("{0} payment gateway not configured. Please contact support.")]
    GatewayUnavailable(&'static str),

    /// A payment gateway call failed.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(err) => auth_status(err),
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::NotOwner => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Client-facing message. Internal failures collapse to a generic
    /// message; the detail goes to logs and Sentry instead.
    fn client_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Gateway(_) => "Payment gateway request failed".to_owned(),
            Self::Auth(err) => auth_message(err),
            other => other.to_string(),
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Gateway(_)
                | Self::Auth(
                    AuthError::Repository(_)
                        | AuthError::PasswordHash
                        | AuthError::Token(TokenError::Signing)
                        | AuthError::EmailDispatch
                )
        )
    }
}

/// Status mapping for authentication failures.
fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials | AuthError::WrongCurrentPassword => StatusCode::UNAUTHORIZED,
        AuthError::AccountLocked => StatusCode::LOCKED,
        AuthError::AccountDeactivated => StatusCode::FORBIDDEN,
        AuthError::Duplicate(_)
        | AuthError::Validation(_)
        | AuthError::InvalidEmail(_)
        | AuthError::InvalidPhone(_)
        | AuthError::VerificationTokenInvalid
        | AuthError::ResetTokenInvalid
        | AuthError::AlreadyVerified => StatusCode::BAD_REQUEST,
        AuthError::Token(TokenError::Expired | TokenError::Invalid) => StatusCode::UNAUTHORIZED,
        AuthError::NoSuchUser => StatusCode::NOT_FOUND,
        AuthError::Token(TokenError::Signing)
        | AuthError::EmailDispatch
        | AuthError::PasswordHash
        | AuthError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client messages for authentication failures. Most reuse the error's
/// display string; internal ones are collapsed.
fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidEmail(_) => "Please provide a valid email".to_owned(),
        AuthError::InvalidPhone(_) => "Please provide a valid phone number".to_owned(),
        AuthError::Token(TokenError::Signing) | AuthError::PasswordHash | AuthError::Repository(_) => {
            "Internal server error".to_owned()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let message = self.client_message();

        let mut body = json!({
            "success": false,
            "message": message,
        });

        // Underlying detail rides along outside production only.
        if self.is_server_error()
            && EXPOSE_ERROR_DETAILS.load(Ordering::Relaxed)
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("error".to_owned(), json!(self.to_string()));
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            status_of(ApiError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Auth(AuthError::AccountLocked)),
            StatusCode::LOCKED
        );
        assert_eq!(
            status_of(ApiError::Auth(AuthError::AccountDeactivated)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Auth(AuthError::Duplicate("email".to_owned()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Auth(AuthError::NoSuchUser)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Auth(AuthError::EmailDispatch)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_token_errors_are_distinguished_in_message_not_status() {
        let expired = ApiError::Auth(AuthError::Token(TokenError::Expired));
        let invalid = ApiError::Auth(AuthError::Token(TokenError::Invalid));

        assert_eq!(expired.client_message(), "Token expired");
        assert_eq!(invalid.client_message(), "Invalid token");
        assert_eq!(status_of(expired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(invalid), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_names_the_role() {
        let err = ApiError::Forbidden(Role::User);
        assert_eq!(
            err.client_message(),
            "User role 'user' is not authorized to access this route"
        );
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_detail_is_hidden_from_message() {
        let err = ApiError::Internal("connection pool exhausted".to_owned());
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_gateway_unavailable_status() {
        assert_eq!(
            status_of(ApiError::GatewayUnavailable("Razorpay")),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = ApiError::Auth(AuthError::InvalidCredentials).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid email or password");
    }
}
