//! Search query logging

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::http::AppState;
use crate::http::error::ApiResult;
use crate::http::session::MaybeSession;
use crate::types::{ScribeError, SearchSource};

pub fn router() -> Router<AppState> {
    Router::new().route("/log", post(log_search))
}

#[derive(Debug, Deserialize)]
struct LogRequest {
    #[serde(default)]
    query: String,
    #[serde(rename = "toolName")]
    tool_name: Option<String>,
    source: Option<String>,
}

async fn log_search(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(request): Json<LogRequest>,
) -> ApiResult<Json<Value>> {
    if request.query.trim().is_empty() {
        return Err(ScribeError::invalid("Query required").into());
    }

    let source = request
        .source
        .as_deref()
        .and_then(|s| s.parse::<SearchSource>().ok())
        .unwrap_or_default();

    state.events.log_search(
        &request.query,
        session.map(|s| s.user_id),
        request.tool_name.as_deref(),
        source,
    );

    Ok(Json(json!({ "success": true })))
}
