//! Payment provider integration
//!
//! REST client plus webhook signature verification. Flows live in the HTTP
//! layer; this module only talks to the provider.

mod client;
mod webhook;

pub use client::{BalanceTransaction, Charge, PaymentIntent, StripeClient};
pub use webhook::{WebhookEvent, verify_signature};
