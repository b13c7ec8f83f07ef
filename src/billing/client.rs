//! Stripe REST client
//!
//! Thin form-encoded client over the payment provider's API: payment intents
//! for the checkout flow, charge and balance-transaction listings for the
//! revenue dashboard. Single-shot calls; provider errors surface as
//! `ScribeError::Payment` with the vendor message kept for logs only.

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::constants::billing::API_BASE;
use crate::types::{Result, ScribeError};

/// Page size for list endpoints
const PAGE_LIMIT: usize = 100;

/// Payment intent, as much of it as the flows read
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One charge row from the listing API
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub created: i64,
    pub amount: i64,
    #[serde(default)]
    pub amount_refunded: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub paid: bool,
}

/// One balance transaction row (net of fees and refunds)
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceTransaction {
    pub created: i64,
    pub net: i64,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Stripe API client with secure key handling
pub struct StripeClient {
    secret_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScribeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            secret_key: SecretString::from(secret_key),
            api_base: api_base.unwrap_or_else(|| API_BASE.to_string()),
            client,
        })
    }

    /// Create a payment intent in minor units with automatic payment methods.
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &[(&str, &str)],
    ) -> Result<PaymentIntent> {
        let amount = amount_minor.to_string();
        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount),
            ("currency".to_string(), currency.to_lowercase()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{}]", key), value.to_string()));
        }

        debug!(amount_minor, currency, "Creating payment intent");
        self.post_form("/payment_intents", &form).await
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent> {
        self.get(&format!("/payment_intents/{}", id), &[]).await
    }

    /// All charges created at or after the epoch cutoff, paginated.
    pub async fn list_charges(&self, created_gte: i64) -> Result<Vec<Charge>> {
        self.list_all("/charges", created_gte, |c: &Charge| {
            // Cursor is the charge id, which we do not deserialize; page by
            // created timestamp instead (strictly before the oldest seen).
            c.created
        })
        .await
    }

    /// All charge/refund balance transactions at or after the cutoff.
    pub async fn list_balance_transactions(
        &self,
        created_gte: i64,
    ) -> Result<Vec<BalanceTransaction>> {
        let rows: Vec<BalanceTransaction> = self
            .list_all("/balance_transactions", created_gte, |t: &BalanceTransaction| t.created)
            .await?;
        Ok(rows
            .into_iter()
            .filter(|t| t.kind == "charge" || t.kind == "refund")
            .collect())
    }

    /// Walk a list endpoint newest-to-oldest until the cutoff is passed.
    async fn list_all<T>(
        &self,
        path: &str,
        created_gte: i64,
        created_of: impl Fn(&T) -> i64,
    ) -> Result<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut out = Vec::new();
        let mut before: Option<i64> = None;

        loop {
            let gte = created_gte.to_string();
            let limit = PAGE_LIMIT.to_string();
            let mut query: Vec<(&str, String)> =
                vec![("limit", limit), ("created[gte]", gte)];
            if let Some(lt) = before {
                query.push(("created[lt]", lt.to_string()));
            }

            let page: Page<T> = self.get(path, &query).await?;
            let oldest = page.data.iter().map(&created_of).min();
            let fetched = page.data.len();
            out.extend(page.data);

            if !page.has_more || fetched == 0 {
                break;
            }
            match oldest {
                Some(ts) if ts > created_gte => before = Some(ts),
                _ => break,
            }
        }

        Ok(out)
    }

    async fn post_form<T>(&self, path: &str, form: &[(String, String)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| ScribeError::Payment(format!("request failed: {}", e)))?;

        Self::decode(response).await
    }

    async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(format!("{}{}", self.api_base, path))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .query(query)
            .send()
            .await
            .map_err(|e| ScribeError::Payment(format!("request failed: {}", e)))?;

        Self::decode(response).await
    }

    async fn decode<T>(response: reqwest::Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ScribeError::Payment(message));
        }

        response
            .json()
            .await
            .map_err(|e| ScribeError::Payment(format!("invalid response body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_intent_deserialization() {
        let body = r#"{
            "id": "pi_123",
            "status": "succeeded",
            "client_secret": "pi_123_secret",
            "metadata": {"userId": "abc"}
        }"#;
        let intent: PaymentIntent = serde_json::from_str(body).unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.status, "succeeded");
        assert_eq!(intent.metadata.get("userId").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_charge_defaults() {
        let body = r#"{
            "created": 1700000000,
            "amount": 1000,
            "currency": "usd",
            "status": "succeeded"
        }"#;
        let charge: Charge = serde_json::from_str(body).unwrap();
        assert_eq!(charge.amount_refunded, 0);
        assert!(!charge.paid);
    }

    #[test]
    fn test_debug_redacts_key() {
        let client =
            StripeClient::new("sk_test_secret".to_string(), None, Duration::from_secs(5)).unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk_test_secret"));
    }
}
