//! Direct REST transport
//!
//! The Phase-B fallback path: a bare v1 `generateContent` call per candidate
//! with the key in the query string. No client state survives between calls.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::GenerationBackend;
use crate::constants::generation;
use crate::types::{Result, ScribeError};

/// Per-call REST transport with secure API key handling
pub struct RestClient {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl RestClient {
    pub fn new(api_key: String, api_base: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScribeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: api_base.unwrap_or_else(|| generation::API_BASE.to_string()),
            client,
        })
    }
}

#[async_trait]
impl GenerationBackend for RestClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base,
            model,
            self.api_key.expose_secret()
        );
        let request = RestGenerateRequest {
            contents: vec![RestContent {
                parts: vec![RestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(%model, "Sending REST generate request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ScribeError::vendor(model, format!("request failed: {}", e)))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ScribeError::vendor(model, format!("invalid response body: {}", e)))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ScribeError::vendor(model, message));
        }

        let text = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .unwrap_or_default();

        Ok(text.to_string())
    }

    async fn list_models(&self) -> Result<serde_json::Value> {
        let url = format!("{}/models?key={}", self.api_base, self.api_key.expose_secret());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScribeError::vendor("models", format!("request failed: {}", e)))?;

        response
            .json()
            .await
            .map_err(|e| ScribeError::vendor("models", format!("invalid response body: {}", e)))
    }

    fn name(&self) -> &str {
        "rest"
    }
}

// Request types

#[derive(Debug, Serialize, Deserialize)]
struct RestGenerateRequest {
    contents: Vec<RestContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RestContent {
    parts: Vec<RestPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RestPart {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = RestGenerateRequest {
            contents: vec![RestContent {
                parts: vec![RestPart {
                    text: "Say hi".to_string(),
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Say hi");
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = RestClient::new(
            "super-secret".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }
}
