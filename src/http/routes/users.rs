//! Admin user management

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::http::AppState;
use crate::http::error::ApiResult;
use crate::http::session::AdminUser;
use crate::types::{ScribeError, SubscriptionPlan};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{user_id}/subscription", patch(update_subscription))
}

async fn list_users(_admin: AdminUser, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = state.db.list_users()?;
    let views: Vec<_> = users.iter().map(|u| u.view()).collect();
    Ok(Json(json!({ "success": true, "users": views })))
}

#[derive(Debug, Deserialize)]
struct SubscriptionRequest {
    #[serde(default)]
    subscription: String,
}

async fn update_subscription(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<SubscriptionRequest>,
) -> ApiResult<Json<Value>> {
    let plan = request
        .subscription
        .parse::<SubscriptionPlan>()
        .map_err(|_| ScribeError::invalid("Invalid subscription type"))?;

    let user = state
        .db
        .update_subscription(user_id, plan)?
        .ok_or_else(|| ScribeError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "success": true, "user": user.view() })))
}
