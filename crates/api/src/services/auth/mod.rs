//! Authentication service.
//!
//! Orchestrates the credential lifecycle: registration, login with account
//! lockout, email verification, password reset and change, and session token
//! issuance. Decision logic (lockout transitions, hashing, token signing)
//! lives in the submodules; persistence goes through `UserRepository`.

mod error;
pub mod lockout;
pub mod onetime;
pub mod password;
pub mod token;

pub use error::AuthError;

use chrono::{DateTime, Duration, Utc};

use harvesthub_core::{Email, Phone};

use crate::db::RepositoryError;
use crate::db::users::{NewAccount, ProfileChanges, UserRepository};
use crate::models::user::Account;
use crate::services::email::EmailService;
use crate::state::AppState;

use self::lockout::LockoutPolicy;
use self::token::TokenIssuer;

/// How long an email verification link stays valid.
const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;

/// How long a password reset link stays valid.
const RESET_TOKEN_TTL_MINUTES: i64 = 30;

/// Password length bounds.
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Display name length bounds.
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;

/// Whether a side-channel email went out; the response message differs but
/// the operation succeeds either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailOutcome {
    Sent,
    Failed,
}

/// Registration input, as received from the client.
#[derive(Debug)]
pub struct NewRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Profile update input; absent fields are left unchanged.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenIssuer,
    email: Option<&'a EmailService>,
    policy: LockoutPolicy,
    frontend_url: &'a str,
}

impl<'a> AuthService<'a> {
    /// Create an authentication service over the shared application state.
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            users: UserRepository::new(state.pool()),
            tokens: state.tokens(),
            email: state.email(),
            policy: LockoutPolicy::from_config(&state.config().lockout),
            frontend_url: &state.config().frontend_url,
        }
    }

    // =========================================================================
    // Registration & verification
    // =========================================================================

    /// Register a new account and dispatch a verification email.
    ///
    /// Email failure does not roll back the account; the outcome tells the
    /// caller which success message to return.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Duplicate` when the email or phone is already
    /// claimed, `AuthError::Validation` for rule violations.
    pub async fn register(
        &self,
        registration: &NewRegistration,
    ) -> Result<(Account, EmailOutcome), AuthError> {
        validate_name(&registration.name)?;
        let email = Email::parse(&registration.email)?;
        let phone = Phone::parse(&registration.phone)?;
        validate_password(&registration.password)?;

        let password_hash =
            password::hash_password(&registration.password).map_err(|_| AuthError::PasswordHash)?;

        let account = self
            .users
            .create(&NewAccount {
                name: registration.name.trim().to_owned(),
                email,
                phone,
                password_hash,
            })
            .await
            .map_err(map_conflict)?;

        let outcome = self.issue_verification_email(&account).await?;

        Ok((account, outcome))
    }

    /// Consume an email verification token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::VerificationTokenInvalid` when no account holds a
    /// matching, unexpired token. Unknown and expired tokens are deliberately
    /// not distinguished.
    pub async fn verify_email(&self, token_plaintext: &str) -> Result<Account, AuthError> {
        let hash = onetime::hash_token(token_plaintext);
        self.users
            .consume_verification_token(&hash, Utc::now())
            .await?
            .ok_or(AuthError::VerificationTokenInvalid)
    }

    /// Re-issue and send a verification email for an authenticated account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyVerified` when the email is already
    /// verified, `AuthError::EmailDispatch` when the send fails.
    pub async fn resend_verification(&self, account: &Account) -> Result<(), AuthError> {
        if account.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        match self.issue_verification_email(account).await? {
            EmailOutcome::Sent => Ok(()),
            EmailOutcome::Failed => Err(AuthError::EmailDispatch),
        }
    }

    /// Generate, store, and email a verification token for an account.
    async fn issue_verification_email(&self, account: &Account) -> Result<EmailOutcome, AuthError> {
        let token = onetime::generate();
        let expires_at = Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS);
        self.users
            .store_verification_token(account.id, &token.hash, expires_at)
            .await?;

        let url = format!("{}/verify-email/{}", self.frontend_url, token.plaintext);
        Ok(self
            .dispatch(|svc| svc.send_verification_email(account.email.as_str(), &account.name, &url))
            .await)
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Authenticate with email and password.
    ///
    /// The lock check runs before password verification: a locked account is
    /// rejected without spending a hash cycle, and the rejection does not
    /// reveal whether the password was right.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidCredentials` for unknown email or wrong password,
    /// `AuthError::AccountLocked` while locked out,
    /// `AuthError::AccountDeactivated` for soft-disabled accounts.
    pub async fn login(
        &self,
        email_raw: &str,
        password_raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, AuthError> {
        let Ok(email) = Email::parse(email_raw) else {
            return Err(AuthError::InvalidCredentials);
        };

        let Some((account, stored_hash)) = self.users.credentials_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if account.is_locked(now) {
            return Err(AuthError::AccountLocked);
        }

        if !account.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        if !password::verify_password(password_raw, &stored_hash) {
            let (attempts, locked_until) = self
                .users
                .record_failed_login(account.id, now, &self.policy)
                .await?;
            tracing::info!(
                user_id = %account.id,
                attempts,
                locked = locked_until.is_some(),
                "failed login attempt"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let account = self.users.record_successful_login(account.id, now).await?;
        Ok(account)
    }

    /// Issue a session token for an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue_session(&self, account: &Account) -> Result<String, AuthError> {
        Ok(self
            .tokens
            .issue(account.id, &account.email, account.role)?)
    }

    // =========================================================================
    // Password reset & change
    // =========================================================================

    /// Start a password reset: store a hashed one-time token and email the
    /// plaintext link.
    ///
    /// A failed send clears the just-stored token so no orphaned reset token
    /// stays live.
    ///
    /// # Errors
    ///
    /// `AuthError::NoSuchUser` when no account has the email,
    /// `AuthError::EmailDispatch` when the send fails.
    pub async fn forgot_password(&self, email_raw: &str) -> Result<(), AuthError> {
        let Ok(email) = Email::parse(email_raw) else {
            return Err(AuthError::NoSuchUser);
        };

        let account = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::NoSuchUser)?;

        let token = onetime::generate();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .store_reset_token(account.id, &token.hash, expires_at)
            .await?;

        let url = format!("{}/reset-password/{}", self.frontend_url, token.plaintext);
        match self
            .dispatch(|svc| svc.send_reset_email(account.email.as_str(), &account.name, &url))
            .await
        {
            EmailOutcome::Sent => Ok(()),
            EmailOutcome::Failed => {
                self.users.clear_reset_token(account.id).await?;
                Err(AuthError::EmailDispatch)
            }
        }
    }

    /// Consume a reset token and set a new password. Lockout state resets in
    /// the same update; the caller issues a fresh session (auto-login).
    ///
    /// # Errors
    ///
    /// `AuthError::ResetTokenInvalid` when no account holds a matching,
    /// unexpired token; `AuthError::Validation` for a weak password.
    pub async fn reset_password(
        &self,
        token_plaintext: &str,
        new_password: &str,
    ) -> Result<Account, AuthError> {
        validate_password(new_password)?;
        let new_hash =
            password::hash_password(new_password).map_err(|_| AuthError::PasswordHash)?;

        let hash = onetime::hash_token(token_plaintext);
        self.users
            .consume_reset_token(&hash, &new_hash, Utc::now())
            .await?
            .ok_or(AuthError::ResetTokenInvalid)
    }

    /// Change the password of an authenticated account. Requires the current
    /// plaintext password to verify against the stored hash.
    ///
    /// # Errors
    ///
    /// `AuthError::WrongCurrentPassword` when the current password does not
    /// verify; `AuthError::Validation` for a weak replacement.
    pub async fn update_password(
        &self,
        account: &Account,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let stored_hash = self
            .users
            .password_hash(account.id)
            .await?
            .ok_or(AuthError::Repository(RepositoryError::NotFound))?;

        if !password::verify_password(current_password, &stored_hash) {
            return Err(AuthError::WrongCurrentPassword);
        }

        validate_password(new_password)?;
        let new_hash =
            password::hash_password(new_password).map_err(|_| AuthError::PasswordHash)?;
        self.users.update_password(account.id, &new_hash).await?;

        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Apply profile changes for an authenticated account.
    ///
    /// # Errors
    ///
    /// `AuthError::Duplicate` when a changed email or phone is already
    /// claimed; validation errors for malformed fields.
    pub async fn update_profile(
        &self,
        account: &Account,
        update: ProfileUpdate,
    ) -> Result<Account, AuthError> {
        if let Some(ref name) = update.name {
            validate_name(name)?;
        }
        let email = update.email.as_deref().map(Email::parse).transpose()?;
        let phone = update.phone.as_deref().map(Phone::parse).transpose()?;

        let changes = ProfileChanges {
            name: update.name.map(|n| n.trim().to_owned()),
            email,
            phone,
            address: update.address,
        };

        self.users
            .update_profile(account.id, &changes)
            .await
            .map_err(map_conflict)
    }

    /// Run an email send if the side-channel is configured; failures are
    /// logged and reported as an outcome, never an abort.
    async fn dispatch<'s, F, Fut>(&'s self, send: F) -> EmailOutcome
    where
        F: FnOnce(&'s EmailService) -> Fut,
        Fut: Future<Output = Result<(), crate::services::email::EmailError>>,
    {
        match self.email {
            Some(svc) => match send(svc).await {
                Ok(()) => EmailOutcome::Sent,
                Err(e) => {
                    tracing::warn!(error = %e, "email dispatch failed");
                    EmailOutcome::Failed
                }
            },
            None => {
                tracing::warn!("email side-channel not configured; skipping send");
                EmailOutcome::Failed
            }
        }
    }
}

/// Map a repository conflict to the field-naming duplicate error.
fn map_conflict(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(field) => AuthError::Duplicate(field),
        other => AuthError::Repository(other),
    }
}

/// Validate a display name: 2-50 characters, letters and spaces only.
///
/// # Errors
///
/// Returns `AuthError::Validation` with a field-level message.
pub fn validate_name(name: &str) -> Result<(), AuthError> {
    let trimmed = name.trim();
    if trimmed.len() < MIN_NAME_LENGTH || trimmed.len() > MAX_NAME_LENGTH {
        return Err(AuthError::Validation(format!(
            "Name must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters"
        )));
    }
    if !trimmed.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(AuthError::Validation(
            "Name can only contain letters and spaces".to_owned(),
        ));
    }
    Ok(())
}

/// Validate a password: 8-128 characters with at least one uppercase letter,
/// one lowercase letter, and one digit.
///
/// # Errors
///
/// Returns `AuthError::Validation` with a field-level message.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH || password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(AuthError::Validation(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .to_owned(),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_accepts_plain_names() {
        assert!(validate_name("Asha Sharma").is_ok());
        assert!(validate_name("  Jo  ").is_ok());
    }

    #[test]
    fn test_validate_name_rejects_short_long_and_symbols() {
        assert!(validate_name("A").is_err());
        assert!(validate_name(&"a".repeat(51)).is_err());
        assert!(validate_name("DROP TABLE;").is_err());
    }

    #[test]
    fn test_validate_password_rules() {
        assert!(validate_password("Str0ngpass").is_ok());
        assert!(validate_password("short1A").is_err()); // 7 chars
        assert!(validate_password("alllowercase1").is_err()); // no upper
        assert!(validate_password("ALLUPPERCASE1").is_err()); // no lower
        assert!(validate_password("NoDigitsHere").is_err()); // no digit
        assert!(validate_password(&format!("Aa1{}", "x".repeat(126))).is_err()); // 129 chars
    }

    #[test]
    fn test_map_conflict_names_field() {
        let err = map_conflict(RepositoryError::Conflict("phone".to_owned()));
        assert_eq!(err.to_string(), "User with this phone already exists");
    }
}
