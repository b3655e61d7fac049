//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::payments::PaymentGateways;
use crate::services::auth::token::TokenIssuer;
use crate::services::email::EmailService;

/// Error constructing application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email transport error: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to shared
/// resources like the database pool, configuration, the token issuer, and
/// the payment gateway clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    tokens: TokenIssuer,
    email: Option<EmailService>,
    gateways: PaymentGateways,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the token issuer, the optional email service, and the payment
    /// gateway clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be configured.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, StateError> {
        let tokens = TokenIssuer::new(&config.jwt.secret, config.jwt.lifetime_days);
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        let gateways = PaymentGateways::from_config(&config.payments);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                email,
                gateways,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the session token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get the email service, when configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Get a reference to the payment gateways.
    #[must_use]
    pub fn gateways(&self) -> &PaymentGateways {
        &self.inner.gateways
    }
}
