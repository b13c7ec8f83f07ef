//! Analytics store
//!
//! Platform sessions, feature usage accumulators, and feedback, plus the
//! aggregate queries behind the analytics dashboard endpoints.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

use super::database::Database;
use crate::types::{DeviceKind, FeatureCategory, FeedbackKind, Result, ResultExt};

/// Input for a tracked browsing session
#[derive(Debug, Clone)]
pub struct NewPlatformSession {
    pub user_id: Option<Uuid>,
    pub session_key: String,
    pub device: DeviceKind,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub location: Option<String>,
    pub duration_secs: Option<i64>,
    pub pages_visited: i64,
}

/// One day of active-user counts
#[derive(Debug, Clone, Serialize)]
pub struct DailyActiveRow {
    pub date: String,
    #[serde(rename = "activeUsers")]
    pub active_users: i64,
    #[serde(rename = "totalSessions")]
    pub total_sessions: i64,
}

/// Sessions and distinct users per device class
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRow {
    pub device: String,
    pub sessions: i64,
    pub users: i64,
}

/// Feature usage aggregate
#[derive(Debug, Clone, Serialize)]
pub struct TopFeatureRow {
    pub feature: String,
    #[serde(rename = "totalUsage")]
    pub total_usage: i64,
    #[serde(rename = "uniqueUsers")]
    pub unique_users: i64,
    #[serde(rename = "avgTimeSpent")]
    pub avg_time_spent: f64,
    pub category: String,
}

/// Per-category feature aggregate
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub category: String,
    #[serde(rename = "totalUsage")]
    pub total_usage: i64,
    #[serde(rename = "uniqueUsers")]
    pub unique_users: i64,
    #[serde(rename = "featureCount")]
    pub feature_count: i64,
}

/// One day of feature adoption
#[derive(Debug, Clone, Serialize)]
pub struct AdoptionRow {
    pub date: String,
    #[serde(rename = "totalUsage")]
    pub total_usage: i64,
    #[serde(rename = "featuresUsed")]
    pub features_used: i64,
}

/// Count of ratings at one star value
#[derive(Debug, Clone, Serialize)]
pub struct RatingBucket {
    pub rating: i64,
    pub count: i64,
}

/// Generic label/count aggregate (feedback kind, status)
#[derive(Debug, Clone, Serialize)]
pub struct LabelCountRow {
    pub label: String,
    pub count: i64,
}

/// Recent feedback with the submitter resolved when known
#[derive(Debug, Clone, Serialize)]
pub struct RecentFeedbackRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub message: String,
    pub rating: Option<i64>,
    pub feature: Option<String>,
    pub status: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    #[serde(rename = "userEmail")]
    pub user_email: Option<String>,
}

/// Average rating per feature
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRatingRow {
    pub feature: String,
    #[serde(rename = "avgRating")]
    pub avg_rating: f64,
    #[serde(rename = "totalRatings")]
    pub total_ratings: i64,
}

impl Database {
    pub fn insert_platform_session(&self, session: &NewPlatformSession) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO platform_sessions
                 (id, user_id, session_key, device, browser, os, location,
                  duration_secs, pages_visited, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    Uuid::new_v4().to_string(),
                    session.user_id.map(|u| u.to_string()),
                    session.session_key,
                    session.device.to_string(),
                    session.browser,
                    session.os,
                    session.location,
                    session.duration_secs,
                    session.pages_visited,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context("Failed to insert platform session")?;
        Ok(())
    }

    /// Accumulate one use of a feature; creates the row on first use.
    pub fn upsert_feature_usage(
        &self,
        user_id: Option<Uuid>,
        feature_name: &str,
        category: FeatureCategory,
        time_spent_secs: i64,
    ) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO feature_usage
                 (id, user_id, feature_name, category, usage_count, total_time_secs, last_used)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)
                 ON CONFLICT(user_id, feature_name) DO UPDATE SET
                     usage_count = usage_count + 1,
                     total_time_secs = total_time_secs + excluded.total_time_secs,
                     category = excluded.category,
                     last_used = excluded.last_used",
                params![
                    Uuid::new_v4().to_string(),
                    user_id.map(|u| u.to_string()),
                    feature_name,
                    category.to_string(),
                    time_spent_secs,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context("Failed to upsert feature usage")?;
        Ok(())
    }

    pub fn insert_feedback(
        &self,
        user_id: Option<Uuid>,
        kind: FeedbackKind,
        rating: Option<u8>,
        subject: &str,
        message: &str,
        feature: Option<&str>,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO feedback
                 (id, user_id, kind, rating, subject, message, feature, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'open', ?8)",
                params![
                    id.to_string(),
                    user_id.map(|u| u.to_string()),
                    kind.to_string(),
                    rating.map(i64::from),
                    subject,
                    message,
                    feature,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context("Failed to insert feedback")?;
        Ok(id)
    }

    /// Daily active users and session totals, oldest day first.
    pub fn daily_active_users(&self, since: DateTime<Utc>) -> Result<Vec<DailyActiveRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT substr(created_at, 1, 10) AS day,
                        COUNT(DISTINCT user_id), COUNT(*)
                 FROM platform_sessions
                 WHERE created_at >= ?1
                 GROUP BY day ORDER BY day ASC",
            )
            .with_context("Failed to prepare daily active users query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok(DailyActiveRow {
                    date: row.get(0)?,
                    active_users: row.get(1)?,
                    total_sessions: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn device_breakdown(&self, since: DateTime<Utc>) -> Result<Vec<DeviceRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT device, COUNT(*), COUNT(DISTINCT user_id)
                 FROM platform_sessions
                 WHERE created_at >= ?1
                 GROUP BY device",
            )
            .with_context("Failed to prepare device breakdown query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok(DeviceRow {
                    device: row.get(0)?,
                    sessions: row.get(1)?,
                    users: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Average duration over sessions that recorded one, plus their count.
    pub fn avg_session_duration(&self, since: DateTime<Utc>) -> Result<(f64, i64)> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COALESCE(AVG(duration_secs), 0.0), COUNT(*)
             FROM platform_sessions
             WHERE created_at >= ?1 AND duration_secs > 0",
            params![since.to_rfc3339()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .with_context("Failed to compute session duration")
    }

    pub fn top_features(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<TopFeatureRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT feature_name, SUM(usage_count), COUNT(DISTINCT user_id),
                        ROUND(AVG(total_time_secs), 2), MAX(category)
                 FROM feature_usage
                 WHERE last_used >= ?1
                 GROUP BY feature_name
                 ORDER BY SUM(usage_count) DESC LIMIT ?2",
            )
            .with_context("Failed to prepare top features query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339(), limit as i64], |row| {
                Ok(TopFeatureRow {
                    feature: row.get(0)?,
                    total_usage: row.get(1)?,
                    unique_users: row.get(2)?,
                    avg_time_spent: row.get(3)?,
                    category: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn feature_categories(&self, since: DateTime<Utc>) -> Result<Vec<CategoryRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT category, SUM(usage_count), COUNT(DISTINCT user_id),
                        COUNT(DISTINCT feature_name)
                 FROM feature_usage
                 WHERE last_used >= ?1
                 GROUP BY category
                 ORDER BY SUM(usage_count) DESC",
            )
            .with_context("Failed to prepare category stats query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok(CategoryRow {
                    category: row.get(0)?,
                    total_usage: row.get(1)?,
                    unique_users: row.get(2)?,
                    feature_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn adoption_trend(&self, since: DateTime<Utc>) -> Result<Vec<AdoptionRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT substr(last_used, 1, 10) AS day, SUM(usage_count),
                        COUNT(DISTINCT feature_name)
                 FROM feature_usage
                 WHERE last_used >= ?1
                 GROUP BY day ORDER BY day ASC",
            )
            .with_context("Failed to prepare adoption trend query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok(AdoptionRow {
                    date: row.get(0)?,
                    total_usage: row.get(1)?,
                    features_used: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn rating_histogram(&self, since: DateTime<Utc>) -> Result<Vec<RatingBucket>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT rating, COUNT(*) FROM feedback
                 WHERE created_at >= ?1 AND kind = 'rating' AND rating IS NOT NULL
                 GROUP BY rating ORDER BY rating ASC",
            )
            .with_context("Failed to prepare rating histogram query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok(RatingBucket {
                    rating: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn average_rating(&self, since: DateTime<Utc>) -> Result<(f64, i64)> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COALESCE(AVG(rating), 0.0), COUNT(*)
             FROM feedback
             WHERE created_at >= ?1 AND kind = 'rating' AND rating IS NOT NULL",
            params![since.to_rfc3339()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .with_context("Failed to compute average rating")
    }

    pub fn feedback_by_kind(&self, since: DateTime<Utc>) -> Result<Vec<LabelCountRow>> {
        self.feedback_counts(since, "kind")
    }

    pub fn feedback_by_status(&self, since: DateTime<Utc>) -> Result<Vec<LabelCountRow>> {
        self.feedback_counts(since, "status")
    }

    fn feedback_counts(&self, since: DateTime<Utc>, column: &str) -> Result<Vec<LabelCountRow>> {
        // column is one of two internal literals, never caller input
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {column}, COUNT(*) FROM feedback
                 WHERE created_at >= ?1
                 GROUP BY {column} ORDER BY COUNT(*) DESC"
            ))
            .with_context("Failed to prepare feedback counts query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok(LabelCountRow {
                    label: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn recent_feedback(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RecentFeedbackRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT f.kind, f.subject, f.message, f.rating, f.feature, f.status,
                        f.created_at, u.name, u.email
                 FROM feedback f LEFT JOIN users u ON u.id = f.user_id
                 WHERE f.created_at >= ?1
                 ORDER BY f.created_at DESC LIMIT ?2",
            )
            .with_context("Failed to prepare recent feedback query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339(), limit as i64], |row| {
                Ok(RecentFeedbackRow {
                    kind: row.get(0)?,
                    subject: row.get(1)?,
                    message: row.get(2)?,
                    rating: row.get(3)?,
                    feature: row.get(4)?,
                    status: row.get(5)?,
                    created_at: row.get(6)?,
                    user_name: row.get(7)?,
                    user_email: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn feature_ratings(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FeatureRatingRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT feature, AVG(rating), COUNT(*)
                 FROM feedback
                 WHERE created_at >= ?1 AND kind = 'rating'
                   AND feature IS NOT NULL AND rating IS NOT NULL
                 GROUP BY feature
                 ORDER BY AVG(rating) DESC LIMIT ?2",
            )
            .with_context("Failed to prepare feature ratings query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339(), limit as i64], |row| {
                Ok(FeatureRatingRow {
                    feature: row.get(0)?,
                    avg_rating: row.get(1)?,
                    total_ratings: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
