//! Payment route handlers.
//!
//! Handlers obtain a gateway client from application state and map an absent
//! client to a 503: whether a gateway is usable is decided once at startup,
//! not by probing globals per request. Amounts arrive in rupees and are
//! converted to the gateways' minor units here.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

// =============================================================================
// Request bodies
// =============================================================================

/// Order / intent creation request. Amount is in rupees.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub amount: i64,
    pub currency: Option<String>,
}

/// Razorpay checkout verification request. Field names follow the values the
/// Razorpay checkout widget posts back.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentBody {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/payments/config`
///
/// Public gateway availability, so the frontend can decide which checkout
/// buttons to render.
pub async fn gateway_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "OK",
        "data": { "gateways": state.gateways().availability() },
    }))
}

/// `POST /api/payments/razorpay/create-order`
pub async fn create_razorpay_order(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Json(body): Json<CreateOrderBody>,
) -> Result<impl IntoResponse> {
    if body.amount <= 0 {
        return Err(ApiError::Validation("Valid amount is required".to_owned()));
    }

    let gateway = state
        .gateways()
        .razorpay()
        .ok_or(ApiError::GatewayUnavailable("Razorpay"))?;

    let currency = body.currency.unwrap_or_else(|| "INR".to_owned());
    let receipt = format!("receipt_{}", Uuid::new_v4().simple());
    let amount_paise = body.amount * 100;

    let order = gateway
        .create_order(
            amount_paise,
            &currency,
            &receipt,
            json!({
                "userId": account.id,
                "userEmail": account.email,
            }),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Order created successfully",
        "data": {
            "orderId": order.id,
            "amount": order.amount,
            "currency": order.currency,
            "keyId": gateway.key_id(),
        },
    })))
}

/// `POST /api/payments/razorpay/verify`
///
/// Verifies the checkout signature locally, then confirms with the gateway
/// that the payment was captured.
pub async fn verify_razorpay_payment(
    State(state): State<AppState>,
    RequireAuth(_account): RequireAuth,
    Json(body): Json<VerifyPaymentBody>,
) -> Result<impl IntoResponse> {
    if body.razorpay_order_id.is_empty()
        || body.razorpay_payment_id.is_empty()
        || body.razorpay_signature.is_empty()
    {
        return Err(ApiError::Validation(
            "Missing required payment verification data".to_owned(),
        ));
    }

    let gateway = state
        .gateways()
        .razorpay()
        .ok_or(ApiError::GatewayUnavailable("Razorpay"))?;

    if !gateway.verify_signature(
        &body.razorpay_order_id,
        &body.razorpay_payment_id,
        &body.razorpay_signature,
    ) {
        return Err(ApiError::BadRequest("Invalid payment signature".to_owned()));
    }

    let payment = gateway.fetch_payment(&body.razorpay_payment_id).await?;
    if payment.status != "captured" {
        return Err(ApiError::BadRequest("Payment not successful".to_owned()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Payment verified successfully",
        "data": {
            "paymentId": payment.id,
            "orderId": body.razorpay_order_id,
            "amount": payment.amount / 100,
            "status": payment.status,
        },
    })))
}

/// `POST /api/payments/stripe/create-intent`
pub async fn create_stripe_intent(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Json(body): Json<CreateOrderBody>,
) -> Result<impl IntoResponse> {
    if body.amount <= 0 {
        return Err(ApiError::Validation("Valid amount is required".to_owned()));
    }

    let gateway = state
        .gateways()
        .stripe()
        .ok_or(ApiError::GatewayUnavailable("Stripe"))?;

    let currency = body.currency.unwrap_or_else(|| "inr".to_owned());
    let user_id = account.id.to_string();
    let intent = gateway
        .create_payment_intent(
            body.amount * 100,
            &currency,
            &[
                ("userId", user_id.as_str()),
                ("userEmail", account.email.as_str()),
            ],
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment intent created successfully",
        "data": {
            "clientSecret": intent.client_secret,
            "paymentIntentId": intent.id,
        },
    })))
}
