//! Authentication error types.

use thiserror::Error;

use harvesthub_core::{EmailError, PhoneError};

use super::token::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// Display strings double as client-facing messages; the status mapping
/// lives in the API error layer.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password. Deliberately generic: the message must not
    /// reveal which field was wrong or whether the account exists.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account is locked out after repeated failures.
    #[error(
        "Account is temporarily locked due to too many failed login attempts. Please try again later."
    )]
    AccountLocked,

    /// The account has been soft-disabled.
    #[error("Account has been deactivated. Please contact support.")]
    AccountDeactivated,

    /// A uniquely-constrained field is already claimed; names the field.
    #[error("User with this {0} already exists")]
    Duplicate(String),

    /// Input failed a validation rule.
    #[error("{0}")]
    Validation(String),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid phone format.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// Session token failure (expired vs malformed stays distinguished).
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Verification token unknown or expired; the two are not
    /// distinguished, to prevent token enumeration.
    #[error("Invalid or expired verification token")]
    VerificationTokenInvalid,

    /// Reset token unknown or expired; not distinguished either.
    #[error("Invalid or expired reset token")]
    ResetTokenInvalid,

    /// Resend requested for an already-verified email.
    #[error("Email is already verified")]
    AlreadyVerified,

    /// Password change rejected: the supplied current password is wrong.
    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    /// Forgot-password for an unknown email.
    #[error("No user found with this email")]
    NoSuchUser,

    /// The email side-channel failed to deliver.
    #[error("Email could not be sent. Please try again.")]
    EmailDispatch,

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
