//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Gateway taxonomy
//!
//! - **InvalidRequest**: rejected before any backend work (empty prompt)
//! - **NotConfigured**: no vendor credentials; no network call is attempted
//! - **Vendor**: one candidate backend failed; recorded, never surfaced alone
//! - **AllBackendsUnavailable**: every candidate in both phases exhausted
//!
//! ## Design Principles
//!
//! - Single unified error type (ScribeError) for the entire application
//! - Only terminal outcomes cross the gateway's public boundary
//! - No panic/unwrap - all errors are recoverable

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ScribeError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Generation Gateway Errors
    // -------------------------------------------------------------------------
    /// Request rejected before any backend attempt
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Vendor credentials missing; generation is disabled
    #[error("Generation backend not configured: {0}")]
    NotConfigured(String),

    /// A single candidate backend failed (internal to the fallback walk)
    #[error("Candidate {model} failed: {message}")]
    Vendor { model: String, message: String },

    /// Every candidate in both phases was exhausted
    #[error("All generation backends unavailable: {detail}")]
    AllBackendsUnavailable { detail: String },

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Auth / Request Errors
    // -------------------------------------------------------------------------
    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Session error: {0}")]
    Session(String),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for ScribeError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to known error types
        if err.downcast_ref::<rusqlite::Error>().is_some() {
            return ScribeError::Storage(err.to_string());
        }
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return ScribeError::Io(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }

        // Default to Storage error for context-wrapped errors
        ScribeError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ScribeError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a per-candidate vendor error
    pub fn vendor(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Vendor {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-request error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a not-configured error
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured(message.into())
    }

    /// Create an exhaustion error carrying the last candidate's detail
    pub fn exhausted(detail: impl Into<String>) -> Self {
        Self::AllBackendsUnavailable {
            detail: detail.into(),
        }
    }

    /// True for failures a client caused and can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::Unauthorized(_)
                | Self::Forbidden(_)
                | Self::NotFound(_)
                | Self::Conflict(_)
        )
    }

    /// True when the generation subsystem (not the caller) is at fault
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured(_) | Self::AllBackendsUnavailable { .. }
        )
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| ScribeError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| ScribeError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
