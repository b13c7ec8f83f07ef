//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Generation gateway constants
pub mod generation {
    /// Ordered fallback model identifiers, tried after the configured
    /// preferred model. First-seen order is preserved when deduplicating.
    pub const FALLBACK_MODELS: &[&str] = &[
        "gemini-2.5-flash",
        "gemini-2.5-pro",
        "gemini-2.0-flash",
        "gemini-2.0-flash-001",
    ];

    /// Per-candidate timeout while probing a model during SDK binding (seconds)
    pub const PROBE_TIMEOUT_SECS: u64 = 10;

    /// Per-request timeout for a single generation call (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Prompt sent when probing whether a model responds at all
    pub const PROBE_PROMPT: &str = "Hi";

    /// Base URL of the vendor generation API
    pub const API_BASE: &str = "https://generativelanguage.googleapis.com/v1";
}

/// HTTP server constants
pub mod server {
    /// Default bind address
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// Default bind port
    pub const DEFAULT_PORT: u16 = 5000;

    /// Development origins allowed by default for CORS
    pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
        "http://localhost:5173",
        "http://localhost:5174",
        "http://127.0.0.1:5173",
        "http://127.0.0.1:5174",
    ];
}

/// Session constants
pub mod session {
    /// Session cookie name
    pub const COOKIE_NAME: &str = "sid";

    /// Session lifetime (hours)
    pub const TTL_HOURS: u64 = 24;
}

/// Billing constants
pub mod billing {
    /// Base URL of the Stripe REST API
    pub const API_BASE: &str = "https://api.stripe.com/v1";

    /// Accepted clock skew for webhook signature timestamps (seconds)
    pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

    /// Maximum months of revenue history a single query may request
    pub const MAX_REVENUE_MONTHS: u32 = 36;
}

/// Analytics constants
pub mod analytics {
    /// Default reporting window (days)
    pub const DEFAULT_PERIOD_DAYS: i64 = 30;

    /// Row cap for top-N aggregate queries
    pub const TOP_LIMIT: usize = 10;

    /// Tool names counted as AI requests on the dashboard
    pub const AI_TOOL_NAMES: &[&str] = &["Content Gen", "Content Improve"];
}
