//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Secrets (vendor API key, Stripe keys) are never serialized back out.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{generation, server, session};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Generation gateway settings
    pub generation: GenerationConfig,

    /// Database settings
    pub database: DatabaseConfig,

    /// Session cookie settings
    pub session: SessionConfig,

    /// Stripe settings
    pub stripe: StripeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            server: ServerConfig::default(),
            generation: GenerationConfig::default(),
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
            stripe: StripeConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ScribeError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if self.generation.probe_timeout_secs == 0 {
            return Err(crate::types::ScribeError::Config(
                "generation.probe_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.generation.request_timeout_secs == 0 {
            return Err(crate::types::ScribeError::Config(
                "generation.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.session.ttl_hours == 0 {
            return Err(crate::types::ScribeError::Config(
                "session.ttl_hours must be greater than 0".to_string(),
            ));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(crate::types::ScribeError::Config(
                "session.cookie_name must not be empty".to_string(),
            ));
        }

        if let Some(base) = &self.generation.api_base
            && url::Url::parse(base).is_err()
        {
            return Err(crate::types::ScribeError::Config(format!(
                "generation.api_base is not a valid URL: {}",
                base
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Origins allowed to send credentialed requests
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
            cors_origins: server::DEFAULT_CORS_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// =============================================================================
// Generation Gateway Configuration
// =============================================================================

/// Settings for the generation gateway
///
/// Note: the API key is handled securely - it is never serialized to output
/// and is redacted in debug output. The gateway converts the key to
/// SecretString internally for runtime protection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Vendor API key (GEMINI_API_KEY). Absence disables generation; it is
    /// never a startup failure.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Preferred model tried before the fixed fallback list (GEMINI_MODEL)
    pub preferred_model: Option<String>,

    /// Per-candidate timeout while probing during SDK binding (seconds)
    pub probe_timeout_secs: u64,

    /// Per-call timeout for a single generation request (seconds)
    pub request_timeout_secs: u64,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("preferred_model", &self.preferred_model)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            preferred_model: None,
            probe_timeout_secs: generation::PROBE_TIMEOUT_SECS,
            request_timeout_secs: generation::REQUEST_TIMEOUT_SECS,
            api_base: None,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("scribeflow.db"),
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime (hours)
    pub ttl_hours: u64,

    /// Session cookie name
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: session::TTL_HOURS,
            cookie_name: session::COOKIE_NAME.to_string(),
        }
    }
}

// =============================================================================
// Stripe Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StripeConfig {
    /// Secret key (STRIPE_SECRET_KEY). Absence disables payment routes.
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,

    /// Publishable key handed to the browser
    pub publishable_key: Option<String>,

    /// Webhook signing secret (STRIPE_WEBHOOK_SECRET)
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("publishable_key", &self.publishable_key)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl StripeConfig {
    /// A key that does not start with `sk_` is treated as absent, matching
    /// the guard the payment routes apply before initializing the client.
    pub fn usable_secret_key(&self) -> Option<&str> {
        self.secret_key
            .as_deref()
            .filter(|k| k.starts_with("sk_"))
    }
}
