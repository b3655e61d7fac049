//! Razorpay gateway client.
//!
//! Order creation and payment lookup go over the REST API with basic auth.
//! Payment verification is local: Razorpay signs `"{order_id}|{payment_id}"`
//! with the key secret (HMAC-SHA256, hex), and we recompute and compare in
//! constant time.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use super::GatewayError;
use crate::config::RazorpayConfig;

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.razorpay.com/v1";

/// A Razorpay order, as returned by the orders API.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    /// Gateway order ID (`order_...`).
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Gateway order status.
    pub status: String,
}

/// A Razorpay payment, as returned by the payments API.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayPayment {
    /// Gateway payment ID (`pay_...`).
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    /// Payment status; `captured` means the money moved.
    pub status: String,
}

/// Razorpay API client.
pub struct RazorpayGateway {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
}

impl RazorpayGateway {
    /// Create a client from credentials.
    #[must_use]
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    /// Public key ID, safe to hand to the frontend checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` when the request fails or Razorpay rejects it.
    pub async fn create_order(
        &self,
        amount_paise: i64,
        currency: &str,
        receipt: &str,
        notes: serde_json::Value,
    ) -> Result<RazorpayOrder, GatewayError> {
        let response = self
            .client
            .post(format!("{API_BASE}/orders"))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&json!({
                "amount": amount_paise,
                "currency": currency,
                "receipt": receipt,
                "notes": notes,
            }))
            .send()
            .await?;

        read_json(response).await
    }

    /// Fetch a payment by ID.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` when the request fails or Razorpay rejects it.
    pub async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment, GatewayError> {
        let response = self
            .client
            .get(format!("{API_BASE}/payments/{payment_id}"))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .send()
            .await?;

        read_json(response).await
    }

    /// Verify a checkout payment signature.
    ///
    /// Recomputes HMAC-SHA256 over `"{order_id}|{payment_id}"` with the key
    /// secret and compares against the hex signature in constant time.
    /// Anything unparseable verifies as `false`.
    #[must_use]
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature_hex: &str) -> bool {
        let Ok(provided) = hex::decode(signature_hex) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.expose_secret().as_bytes())
        else {
            return false;
        };
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());

        mac.verify_slice(&provided).is_ok()
    }

    /// Compute the signature Razorpay would produce for a payment. Test and
    /// tooling helper; verification goes through [`Self::verify_signature`].
    #[must_use]
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Parse a gateway response, mapping non-2xx statuses to `GatewayError::Api`.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json::<T>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> RazorpayGateway {
        RazorpayGateway::new(&RazorpayConfig {
            key_id: "rzp_test_key".to_owned(),
            key_secret: SecretString::from("rzp_test_secret"),
        })
    }

    #[test]
    fn test_signature_round_trip() {
        let gw = gateway();
        let signature = gw.sign("order_abc", "pay_xyz");
        assert!(gw.verify_signature("order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_tampered_ids_fail_verification() {
        let gw = gateway();
        let signature = gw.sign("order_abc", "pay_xyz");
        assert!(!gw.verify_signature("order_abd", "pay_xyz", &signature));
        assert!(!gw.verify_signature("order_abc", "pay_xyy", &signature));
    }

    #[test]
    fn test_wrong_secret_fails_verification() {
        let signature = gateway().sign("order_abc", "pay_xyz");
        let other = RazorpayGateway::new(&RazorpayConfig {
            key_id: "rzp_test_key".to_owned(),
            key_secret: SecretString::from("different_secret"),
        });
        assert!(!other.verify_signature("order_abc", "pay_xyz", &signature));
    }

    #[test]
    fn test_non_hex_signature_is_rejected() {
        assert!(!gateway().verify_signature("order_abc", "pay_xyz", "zz-not-hex"));
        assert!(!gateway().verify_signature("order_abc", "pay_xyz", ""));
    }
}
