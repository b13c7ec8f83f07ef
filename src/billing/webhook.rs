//! Webhook signature verification
//!
//! Stripe signs the raw payload as HMAC-SHA256 over `"{t}.{payload}"` and
//! sends `t` plus one or more `v1` signatures in the `Stripe-Signature`
//! header. Verification is constant-time and bounded by a timestamp
//! tolerance to reject replays.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::constants::billing::WEBHOOK_TOLERANCE_SECS;
use crate::types::{Result, ScribeError};

type HmacSha256 = Hmac<Sha256>;

/// Parsed webhook event envelope
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| ScribeError::Payment(format!("invalid webhook payload: {}", e)))
    }
}

/// Verify a `Stripe-Signature` header against the raw payload.
///
/// `now` is the current unix timestamp, passed in so tests control the clock.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<()> {
    let (timestamp, signatures) = parse_header(header)?;

    if (now - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(ScribeError::Payment(
            "webhook timestamp outside tolerance".to_string(),
        ));
    }

    let mut signed_payload = Vec::with_capacity(payload.len() + 16);
    signed_payload.extend_from_slice(timestamp.to_string().as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);

    for signature in &signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ScribeError::Payment(format!("invalid webhook secret: {}", e)))?;
        mac.update(&signed_payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(ScribeError::Payment(
        "webhook signature verification failed".to_string(),
    ))
}

/// Split `t=...,v1=...,v1=...` into the timestamp and v1 signatures.
fn parse_header(header: &str) -> Result<(i64, Vec<String>)> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => signatures.push(value.to_string()),
            _ => {}
        }
    }

    match (timestamp, signatures.is_empty()) {
        (Some(t), false) => Ok((t, signatures)),
        _ => Err(ScribeError::Payment(
            "malformed webhook signature header".to_string(),
        )),
    }
}
