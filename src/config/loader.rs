//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Config file (scribeflow.toml, path overridable)
//! 3. Environment variables (SCRIBEFLOW__* prefix, `__` nesting)
//! 4. Conventional vendor env names (GEMINI_API_KEY, STRIPE_SECRET_KEY, ...)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::types::{Result, ScribeError};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → file → env vars → conventional secrets
    pub fn load() -> Result<Config> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration starting from a specific file path
    pub fn load_from(path: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if path.exists() {
            debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // e.g. SCRIBEFLOW__SERVER__PORT -> server.port
        figment = figment.merge(Env::prefixed("SCRIBEFLOW__").split("__").lowercase(true));

        let mut config: Config = figment
            .extract()
            .map_err(|e| ScribeError::Config(format!("Configuration error: {}", e)))?;

        Self::hydrate_secrets(&mut config);

        // Validate configuration after loading
        config.validate()?;

        Ok(config)
    }

    /// Conventional env names take precedence over file-provided secrets.
    /// Missing keys stay None; generation and payments degrade gracefully.
    fn hydrate_secrets(config: &mut Config) {
        if let Ok(key) = env::var("GEMINI_API_KEY")
            && !key.trim().is_empty()
        {
            config.generation.api_key = Some(key);
        }
        if let Ok(model) = env::var("GEMINI_MODEL")
            && !model.trim().is_empty()
        {
            config.generation.preferred_model = Some(model.trim().to_string());
        }
        if let Ok(key) = env::var("STRIPE_SECRET_KEY")
            && !key.trim().is_empty()
        {
            config.stripe.secret_key = Some(key);
        }
        if let Ok(key) = env::var("STRIPE_PUBLISHABLE_KEY")
            && !key.trim().is_empty()
        {
            config.stripe.publishable_key = Some(key);
        }
        if let Ok(secret) = env::var("STRIPE_WEBHOOK_SECRET")
            && !secret.trim().is_empty()
        {
            config.stripe.webhook_secret = Some(secret);
        }
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Config file path: SCRIBEFLOW_CONFIG override or ./scribeflow.toml
    pub fn config_path() -> PathBuf {
        env::var("SCRIBEFLOW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("scribeflow.toml"))
    }

    /// Show current effective configuration (secrets stay redacted)
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| ScribeError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default config file; refuses to clobber unless forced
    pub fn init(force: bool) -> Result<PathBuf> {
        let path = Self::config_path();

        if path.exists() && !force {
            return Err(ScribeError::Config(format!(
                "Config already exists: {} (use --force to overwrite)",
                path.display()
            )));
        }

        fs::write(&path, Self::default_config_file())?;
        Ok(path)
    }

    /// Generate default config content (TOML)
    fn default_config_file() -> String {
        r#"# Scribeflow Configuration
# Secrets are read from the environment: GEMINI_API_KEY, GEMINI_MODEL,
# STRIPE_SECRET_KEY, STRIPE_PUBLISHABLE_KEY, STRIPE_WEBHOOK_SECRET.

version = "1.0"

[server]
host = "127.0.0.1"
port = 5000
cors_origins = [
    "http://localhost:5173",
    "http://localhost:5174",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5174",
]

[generation]
probe_timeout_secs = 10
request_timeout_secs = 30

[database]
path = "scribeflow.db"

[session]
ttl_hours = 24
cookie_name = "sid"
"#
        .to_string()
    }
}
