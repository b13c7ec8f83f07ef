pub mod analytics;
pub mod database;
pub mod events;
pub mod users;

pub use analytics::{
    AdoptionRow, CategoryRow, DailyActiveRow, DeviceRow, FeatureRatingRow, LabelCountRow,
    NewPlatformSession, RatingBucket, RecentFeedbackRow, TopFeatureRow,
};
pub use database::{Database, PoolConfig, SharedDatabase};
pub use events::{SearchCountRow, ToolCountRow, ToolUsageRow, TrendRow};
pub use users::PREMIUM_VARIANTS;
