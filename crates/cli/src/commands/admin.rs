//! Account management commands.

use secrecy::SecretString;
use thiserror::Error;

use harvesthub_core::{Email, Phone, Role};

use harvesthub_api::db::users::{NewAccount, UserRepository};
use harvesthub_api::db::{self, RepositoryError};
use harvesthub_api::services::auth::{password, validate_password};

/// Errors that can occur while managing accounts.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password hashing failed")]
    PasswordHash,
}

/// Create an account with the given role.
///
/// The password is validated against the same rules the API enforces and
/// hashed before storage.
///
/// # Errors
///
/// Returns `AdminError` for invalid input, a missing `DATABASE_URL`, or a
/// failed insert (including duplicate email/phone).
pub async fn create_account(
    email: &str,
    name: &str,
    phone: &str,
    plaintext_password: &str,
    role: &str,
) -> Result<(), AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email).map_err(|e| AdminError::InvalidInput {
        field: "email",
        message: e.to_string(),
    })?;
    let phone = Phone::parse(phone).map_err(|e| AdminError::InvalidInput {
        field: "phone",
        message: e.to_string(),
    })?;
    let role: Role = role.parse().map_err(|_| AdminError::InvalidInput {
        field: "role",
        message: "expected one of: user, admin, vendor".to_string(),
    })?;
    validate_password(plaintext_password).map_err(|e| AdminError::InvalidInput {
        field: "password",
        message: e.to_string(),
    })?;

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| AdminError::MissingEnvVar("DATABASE_URL"))?;
    let pool = db::create_pool(&SecretString::from(database_url)).await?;

    let password_hash =
        password::hash_password(plaintext_password).map_err(|_| AdminError::PasswordHash)?;

    let users = UserRepository::new(&pool);
    let account = users
        .create(&NewAccount {
            name: name.trim().to_owned(),
            email,
            phone,
            password_hash,
        })
        .await?;

    let account = users.update_admin_fields(account.id, Some(role), None).await?;

    tracing::info!(
        id = %account.id,
        email = %account.email,
        role = %account.role,
        "Account created"
    );

    Ok(())
}
