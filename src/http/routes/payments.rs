//! Payment flows
//!
//! Checkout intent creation and confirmation, publishable-key handoff, and
//! the signed webhook. Upgrades flip the account to Premium; downgrade paths
//! are admin-only and live in the users router.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::billing::{StripeClient, WebhookEvent, verify_signature};
use crate::http::AppState;
use crate::http::error::ApiResult;
use crate::http::session::CurrentUser;
use crate::types::{ScribeError, SubscriptionPlan};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/confirm-payment", post(confirm_payment))
        .route("/confirm-subscription", post(confirm_subscription))
        .route("/config", get(config))
        .route("/webhook", post(webhook))
}

fn stripe_client(state: &AppState) -> ApiResult<&StripeClient> {
    state
        .stripe
        .as_deref()
        .ok_or_else(|| ScribeError::Payment("Stripe not configured".to_string()).into())
}

#[derive(Debug, Deserialize)]
struct CreateIntentRequest {
    amount: Option<f64>,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

async fn create_payment_intent(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateIntentRequest>,
) -> ApiResult<Json<Value>> {
    let stripe = stripe_client(&state)?;

    let amount = request.amount.unwrap_or_default();
    if amount <= 0.0 {
        return Err(ScribeError::invalid("Valid amount is required").into());
    }

    let user = current.user;
    let user_id = user.id.to_string();
    let amount_minor = (amount * 100.0).round() as i64;

    let intent = stripe
        .create_payment_intent(
            amount_minor,
            &request.currency,
            &[
                ("userId", user_id.as_str()),
                ("userName", user.name.as_str()),
                ("userEmail", user.email.as_str()),
            ],
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "clientSecret": intent.client_secret,
        "paymentIntentId": intent.id,
    })))
}

#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    #[serde(rename = "paymentIntentId")]
    payment_intent_id: Option<String>,
}

async fn confirm_payment(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> ApiResult<Json<Value>> {
    let stripe = stripe_client(&state)?;

    let Some(intent_id) = request.payment_intent_id.filter(|id| !id.is_empty()) else {
        return Err(ScribeError::invalid("Payment intent ID required").into());
    };

    let intent = stripe.retrieve_payment_intent(&intent_id).await?;
    if intent.status != "succeeded" {
        return Err(
            ScribeError::invalid(format!("Payment status: {}", intent.status)).into(),
        );
    }

    state
        .db
        .update_subscription(current.user.id, SubscriptionPlan::Premium)?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment successful",
        "subscription": SubscriptionPlan::Premium.to_string(),
    })))
}

async fn confirm_subscription(
    current: CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> ApiResult<Json<Value>> {
    if request
        .payment_intent_id
        .as_deref()
        .unwrap_or_default()
        .is_empty()
    {
        return Err(ScribeError::invalid("Payment intent ID required").into());
    }

    let user = state
        .db
        .update_subscription(current.user.id, SubscriptionPlan::Premium)?
        .ok_or_else(|| ScribeError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Subscription updated successfully",
        "user": user.view(),
    })))
}

async fn config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "publishableKey": state.config.stripe.publishable_key,
    }))
}

/// Signed webhook endpoint. Reads the raw body; the JSON extractor would
/// break signature verification.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ScribeError::invalid("Webhook not configured"))?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ScribeError::invalid("Missing Stripe-Signature header"))?;

    if let Err(e) = verify_signature(&body, signature, secret, Utc::now().timestamp()) {
        warn!("Webhook signature verification failed: {}", e);
        return Err(ScribeError::invalid("Webhook signature verification failed").into());
    }

    let event = WebhookEvent::parse(&body)
        .map_err(|_| ScribeError::invalid("Invalid webhook payload"))?;

    match event.kind.as_str() {
        "payment_intent.succeeded" => {
            let intent = &event.data.object;
            info!(intent = %intent["id"], "Payment succeeded");

            let user_id = intent
                .get("metadata")
                .and_then(|m| m.get("userId"))
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok());

            if let Some(user_id) = user_id {
                match state.db.update_subscription(user_id, SubscriptionPlan::Premium) {
                    Ok(Some(user)) => info!(email = %user.email, "User upgraded to Premium"),
                    Ok(None) => warn!(%user_id, "Webhook references unknown user"),
                    Err(e) => error!("Failed to update user subscription: {}", e),
                }
            }
        }
        "payment_intent.payment_failed" => {
            info!(intent = %event.data.object["id"], "Payment failed");
        }
        other => {
            info!(kind = other, "Unhandled webhook event type");
        }
    }

    Ok(Json(json!({ "received": true })))
}
