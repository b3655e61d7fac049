//! Payment gateway clients.
//!
//! Gateways are constructed once at startup from configuration and carried in
//! application state. A gateway missing its credentials is simply absent, and
//! the capability checks here replace any "is this global truthy" probing:
//! handlers ask [`PaymentGateways`] for a client and map `None` to a 503.
//!
//! The gateway APIs themselves are opaque remote services; these clients
//! cover exactly the calls the checkout flow needs.

pub mod razorpay;
pub mod stripe;

use serde::Serialize;
use thiserror::Error;

use crate::config::PaymentsConfig;

pub use razorpay::RazorpayGateway;
pub use stripe::StripeGateway;

/// Errors from payment gateway calls.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure reaching the gateway.
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the request.
    #[error("gateway rejected request ({status}): {message}")]
    Api {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway-provided error description.
        message: String,
    },
}

/// Gateway availability, as reported to clients.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAvailability {
    pub razorpay: bool,
    pub stripe: bool,
}

/// The set of configured payment gateways.
pub struct PaymentGateways {
    razorpay: Option<RazorpayGateway>,
    stripe: Option<StripeGateway>,
}

impl PaymentGateways {
    /// Build gateway clients from configuration. Unconfigured gateways are
    /// left absent.
    #[must_use]
    pub fn from_config(config: &PaymentsConfig) -> Self {
        let razorpay = config.razorpay.as_ref().map(RazorpayGateway::new);
        if razorpay.is_some() {
            tracing::info!("Razorpay gateway configured");
        } else {
            tracing::warn!("Razorpay gateway not configured");
        }

        let stripe = config.stripe.as_ref().map(StripeGateway::new);
        if stripe.is_some() {
            tracing::info!("Stripe gateway configured");
        } else {
            tracing::warn!("Stripe gateway not configured");
        }

        Self { razorpay, stripe }
    }

    /// The Razorpay client, when configured.
    #[must_use]
    pub const fn razorpay(&self) -> Option<&RazorpayGateway> {
        self.razorpay.as_ref()
    }

    /// The Stripe client, when configured.
    #[must_use]
    pub const fn stripe(&self) -> Option<&StripeGateway> {
        self.stripe.as_ref()
    }

    /// Availability summary for the public config endpoint.
    #[must_use]
    pub const fn availability(&self) -> GatewayAvailability {
        GatewayAvailability {
            razorpay: self.razorpay.is_some(),
            stripe: self.stripe.is_some(),
        }
    }
}
