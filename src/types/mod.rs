pub mod domain;
pub mod error;

pub use domain::{
    DeviceKind, FeatureCategory, FeatureUsage, Feedback, FeedbackKind, FeedbackStatus,
    PlatformSession, Role, SearchQuery, SearchSource, SubscriptionPlan, UsageEvent, User, UserView,
};
pub use error::{Result, ResultExt, ScribeError};
