//! Domain Types
//!
//! Persistent entities shared by the storage layer and the HTTP surface.
//! Serialized views never expose password hashes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Users
// =============================================================================

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}. Valid values: user, admin", s)),
        }
    }
}

/// Subscription plans accepted on every write path.
///
/// The database column is free-form text because historical rows carry other
/// variants; reads that must count "premium" handle those separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Premium,
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionPlan::Free => write!(f, "Free"),
            SubscriptionPlan::Premium => write!(f, "Premium"),
        }
    }
}

impl std::str::FromStr for SubscriptionPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Free" => Ok(SubscriptionPlan::Free),
            "Premium" => Ok(SubscriptionPlan::Premium),
            _ => Err(format!(
                "Invalid subscription type: {}. Valid values: Free, Premium",
                s
            )),
        }
    }
}

/// A registered account, as stored
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub subscription: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Client-facing projection; the hash never leaves the storage layer
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            subscription: self.subscription.clone(),
            created_at: self.created_at,
        }
    }
}

/// Serialized user projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub subscription: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Usage & Search Logging
// =============================================================================

/// One tool invocation, recorded fire-and-forget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub tool_name: String,
    pub created_at: DateTime<Utc>,
}

/// Where a logged query originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    #[default]
    SearchBar,
    ToolUse,
    Suggestion,
}

impl std::fmt::Display for SearchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchSource::SearchBar => write!(f, "search_bar"),
            SearchSource::ToolUse => write!(f, "tool_use"),
            SearchSource::Suggestion => write!(f, "suggestion"),
        }
    }
}

impl std::str::FromStr for SearchSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search_bar" => Ok(SearchSource::SearchBar),
            "tool_use" => Ok(SearchSource::ToolUse),
            "suggestion" => Ok(SearchSource::Suggestion),
            _ => Err(format!(
                "Unknown search source: {}. Valid values: search_bar, tool_use, suggestion",
                s
            )),
        }
    }
}

/// One logged query (normalized to trimmed lowercase before storage)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub id: Uuid,
    pub query: String,
    pub user_id: Option<Uuid>,
    pub tool_name: Option<String>,
    pub source: SearchSource,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Analytics
// =============================================================================

/// Client device class for platform sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Desktop => write!(f, "desktop"),
            DeviceKind::Mobile => write!(f, "mobile"),
            DeviceKind::Tablet => write!(f, "tablet"),
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desktop" => Ok(DeviceKind::Desktop),
            "mobile" => Ok(DeviceKind::Mobile),
            "tablet" => Ok(DeviceKind::Tablet),
            _ => Err(format!(
                "Unknown device: {}. Valid values: desktop, mobile, tablet",
                s
            )),
        }
    }
}

/// A tracked browsing session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSession {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_key: String,
    pub device: DeviceKind,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub location: Option<String>,
    pub duration_secs: Option<i64>,
    pub pages_visited: i64,
    pub created_at: DateTime<Utc>,
}

/// Feature grouping for usage analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    #[default]
    AiTool,
    Content,
    Export,
    Collaboration,
}

impl std::fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureCategory::AiTool => write!(f, "ai_tool"),
            FeatureCategory::Content => write!(f, "content"),
            FeatureCategory::Export => write!(f, "export"),
            FeatureCategory::Collaboration => write!(f, "collaboration"),
        }
    }
}

impl std::str::FromStr for FeatureCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai_tool" => Ok(FeatureCategory::AiTool),
            "content" => Ok(FeatureCategory::Content),
            "export" => Ok(FeatureCategory::Export),
            "collaboration" => Ok(FeatureCategory::Collaboration),
            _ => Err(format!(
                "Unknown category: {}. Valid values: ai_tool, content, export, collaboration",
                s
            )),
        }
    }
}

/// Per-user per-feature usage accumulator (upserted on every use)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureUsage {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub feature_name: String,
    pub category: FeatureCategory,
    pub usage_count: i64,
    pub total_time_secs: i64,
    pub last_used: DateTime<Utc>,
}

// =============================================================================
// Feedback
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Rating,
    Suggestion,
    BugReport,
    FeatureRequest,
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackKind::Rating => write!(f, "rating"),
            FeedbackKind::Suggestion => write!(f, "suggestion"),
            FeedbackKind::BugReport => write!(f, "bug_report"),
            FeedbackKind::FeatureRequest => write!(f, "feature_request"),
        }
    }
}

impl std::str::FromStr for FeedbackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rating" => Ok(FeedbackKind::Rating),
            "suggestion" => Ok(FeedbackKind::Suggestion),
            "bug_report" => Ok(FeedbackKind::BugReport),
            "feature_request" => Ok(FeedbackKind::FeatureRequest),
            _ => Err(format!(
                "Unknown feedback type: {}. Valid values: rating, suggestion, bug_report, feature_request",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl std::fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackStatus::Open => write!(f, "open"),
            FeedbackStatus::InProgress => write!(f, "in_progress"),
            FeedbackStatus::Resolved => write!(f, "resolved"),
            FeedbackStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for FeedbackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(FeedbackStatus::Open),
            "in_progress" => Ok(FeedbackStatus::InProgress),
            "resolved" => Ok(FeedbackStatus::Resolved),
            "closed" => Ok(FeedbackStatus::Closed),
            _ => Err(format!(
                "Unknown feedback status: {}. Valid values: open, in_progress, resolved, closed",
                s
            )),
        }
    }
}

/// User-submitted feedback entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: FeedbackKind,
    pub rating: Option<u8>,
    pub subject: String,
    pub message: String,
    pub feature: Option<String>,
    pub status: FeedbackStatus,
    pub admin_response: Option<String>,
    pub response_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
