//! Generation transports
//!
//! The two ways a candidate model can be reached: the SDK-style bound client
//! and the direct REST call. Both sit behind `GenerationBackend` so the
//! gateway and resolver never know which concrete transport they drive, and
//! tests can substitute call-counting fakes.

mod rest;
mod sdk;

pub use rest::RestClient;
pub use sdk::SdkClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{Result, ScribeError};

/// Shared transport handle for concurrent access across requests.
pub type SharedBackend = Arc<dyn GenerationBackend>;

/// A single-shot generation call against one model.
///
/// Implementations perform exactly one attempt; fallback and timeout policy
/// live in the gateway and resolver.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text with the given model. An empty string is a valid
    /// (unusable) response and is handled by the caller, not an error.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    /// Raw vendor model listing, where the transport supports it.
    async fn list_models(&self) -> Result<serde_json::Value> {
        Err(ScribeError::not_configured(
            "model listing not supported by this backend",
        ))
    }

    /// Transport name for logging
    fn name(&self) -> &str;
}
