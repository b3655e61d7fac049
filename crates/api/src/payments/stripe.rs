//! Stripe gateway client.
//!
//! Creates payment intents over the form-encoded REST API with bearer auth.
//! The client secret in the response goes back to the frontend, which
//! completes the payment against Stripe directly.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::GatewayError;
use crate::config::StripeConfig;

const API_BASE: &str = "https://api.stripe.com/v1";

/// A Stripe payment intent, as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Gateway intent ID (`pi_...`).
    pub id: String,
    /// Client secret handed to the frontend.
    pub client_secret: String,
    /// Intent status.
    pub status: String,
}

/// Stripe API client.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: SecretString,
}

impl StripeGateway {
    /// Create a client from credentials.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: config.secret_key.clone(),
        }
    }

    /// Create a payment intent for `amount_minor` (smallest currency unit).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` when the request fails or Stripe rejects it.
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &[(&str, &str)],
    ) -> Result<PaymentIntent, GatewayError> {
        let mut params: Vec<(String, String)> = vec![
            ("amount".to_owned(), amount_minor.to_string()),
            ("currency".to_owned(), currency.to_owned()),
            (
                "automatic_payment_methods[enabled]".to_owned(),
                "true".to_owned(),
            ),
        ];
        for (key, value) in metadata {
            params.push((format!("metadata[{key}]"), (*value).to_owned()));
        }

        let response = self
            .client
            .post(format!("{API_BASE}/payment_intents"))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<PaymentIntent>().await?)
    }
}
