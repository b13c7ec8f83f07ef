//! Product analytics endpoints
//!
//! Admin-gated aggregate reads plus the open tracking/feedback writers the
//! client fires as users move through the app.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::stats::period_days;
use crate::constants::analytics::TOP_LIMIT;
use crate::http::AppState;
use crate::http::error::ApiResult;
use crate::http::session::{AdminUser, MaybeSession};
use crate::storage::NewPlatformSession;
use crate::types::{DeviceKind, FeatureCategory, FeedbackKind, ScribeError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/platform-usage", get(platform_usage))
        .route("/feature-usage", get(feature_usage))
        .route("/feedback-metrics", get(feedback_metrics))
        .route("/track-usage", post(track_usage))
        .route("/feedback", post(submit_feedback))
}

#[derive(Debug, Deserialize)]
struct PeriodQuery {
    #[serde(default = "default_period")]
    period: String,
}

fn default_period() -> String {
    "30d".to_string()
}

async fn platform_usage(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Value>> {
    let since = Utc::now() - Duration::days(period_days(&query.period));

    let daily_users = state.db.daily_active_users(since)?;
    let device_stats = state.db.device_breakdown(since)?;
    let (avg_duration, total_sessions) = state.db.avg_session_duration(since)?;

    Ok(Json(json!({
        "success": true,
        "period": query.period,
        "dailyUsers": daily_users,
        "deviceStats": device_stats,
        "avgSessionDuration": avg_duration,
        "totalSessions": total_sessions,
    })))
}

async fn feature_usage(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Value>> {
    let since = Utc::now() - Duration::days(period_days(&query.period));

    let top_features = state.db.top_features(since, TOP_LIMIT)?;
    let category_stats = state.db.feature_categories(since)?;
    let adoption_trend = state.db.adoption_trend(since)?;

    Ok(Json(json!({
        "success": true,
        "period": query.period,
        "topFeatures": top_features,
        "categoryStats": category_stats,
        "adoptionTrend": adoption_trend,
    })))
}

async fn feedback_metrics(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Value>> {
    let since = Utc::now() - Duration::days(period_days(&query.period));

    let satisfaction = state.db.rating_histogram(since)?;
    let (avg_rating, total_ratings) = state.db.average_rating(since)?;
    let by_kind = state.db.feedback_by_kind(since)?;
    let by_status = state.db.feedback_by_status(since)?;
    let recent = state.db.recent_feedback(since, TOP_LIMIT)?;
    let feature_ratings = state.db.feature_ratings(since, TOP_LIMIT)?;

    Ok(Json(json!({
        "success": true,
        "period": query.period,
        "satisfactionStats": satisfaction,
        "avgRating": avg_rating,
        "totalRatings": total_ratings,
        "feedbackByType": by_kind,
        "feedbackByStatus": by_status,
        "recentFeedback": recent,
        "featureRatings": feature_ratings,
    })))
}

// =============================================================================
// Tracking writers
// =============================================================================

#[derive(Debug, Deserialize)]
struct TrackRequest {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: TrackData,
}

#[derive(Debug, Default, Deserialize)]
struct TrackData {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    device: Option<String>,
    browser: Option<String>,
    os: Option<String>,
    location: Option<String>,
    duration: Option<i64>,
    #[serde(rename = "pagesVisited")]
    pages_visited: Option<i64>,
    #[serde(rename = "featureName")]
    feature_name: Option<String>,
    category: Option<String>,
    #[serde(rename = "timeSpent")]
    time_spent: Option<i64>,
}

async fn track_usage(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(request): Json<TrackRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = session.map(|s| s.user_id);

    match request.kind.as_str() {
        "session" => {
            let data = request.data;
            let device = data
                .device
                .as_deref()
                .and_then(|d| d.parse::<DeviceKind>().ok())
                .unwrap_or_default();

            state.db.insert_platform_session(&NewPlatformSession {
                user_id,
                session_key: data.session_id.unwrap_or_default(),
                device,
                browser: data.browser,
                os: data.os,
                location: data.location,
                duration_secs: data.duration,
                pages_visited: data.pages_visited.unwrap_or(1),
            })?;
        }
        "feature" => {
            let data = request.data;
            let Some(feature_name) = data.feature_name.filter(|f| !f.is_empty()) else {
                return Err(ScribeError::invalid("Feature name required").into());
            };
            let category = data
                .category
                .as_deref()
                .and_then(|c| c.parse::<FeatureCategory>().ok())
                .unwrap_or_default();

            state.db.upsert_feature_usage(
                user_id,
                &feature_name,
                category,
                data.time_spent.unwrap_or(0),
            )?;
        }
        _ => {
            return Err(ScribeError::invalid("Invalid tracking type").into());
        }
    }

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    #[serde(rename = "type", default)]
    kind: String,
    rating: Option<u8>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    message: String,
    feature: Option<String>,
}

async fn submit_feedback(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<Json<Value>> {
    if request.kind.is_empty() || request.subject.is_empty() || request.message.is_empty() {
        return Err(ScribeError::invalid("Type, subject, and message are required").into());
    }

    let kind = request
        .kind
        .parse::<FeedbackKind>()
        .map_err(ScribeError::InvalidRequest)?;

    // Ratings only make sense on rating-type feedback
    let rating = match kind {
        FeedbackKind::Rating => request.rating.filter(|r| (1..=5).contains(r)),
        _ => None,
    };

    let id = state.db.insert_feedback(
        session.map(|s| s.user_id),
        kind,
        rating,
        &request.subject,
        &request.message,
        request.feature.as_deref(),
    )?;

    Ok(Json(json!({
        "success": true,
        "message": "Feedback submitted successfully",
        "feedbackId": id,
    })))
}
