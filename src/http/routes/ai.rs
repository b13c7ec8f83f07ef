//! Generation endpoints
//!
//! The editor-facing processing route plus the operator diagnostics around
//! the SDK binding. Response field names match what the UI already reads.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::ai::Operation;
use crate::http::error::ApiResult;
use crate::http::session::MaybeSession;
use crate::http::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process", post(process))
        .route("/status", get(status))
        .route("/reinit", post(reinit))
        .route("/test", get(test_sdk))
        .route("/test-rest", get(test_rest))
        .route("/models-raw", get(models_raw))
}

#[derive(Debug, Deserialize)]
struct ProcessRequest {
    #[serde(default)]
    prompt: String,
    #[serde(rename = "type", default = "default_operation")]
    operation: String,
    #[serde(rename = "toolName")]
    tool_name: Option<String>,
}

fn default_operation() -> String {
    "generate".to_string()
}

async fn process(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<Json<Value>> {
    let operation = Operation::parse(&request.operation);
    let user_id = session.map(|s| s.user_id);

    let result = state
        .gateway
        .generate(
            &request.prompt,
            &operation,
            request.tool_name.as_deref(),
            user_id,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "response": result.text,
        "type": operation.as_str(),
        "model": result.model,
        "method": result.transport.to_string(),
    })))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.gateway.snapshot();
    Json(json!({
        "sdkInitialized": snapshot.bound,
        "currentModel": snapshot.current_model,
        "initializationAttempted": snapshot.initialization_attempted,
        "hasApiKey": state.gateway.has_api_key(),
        "lastError": snapshot.last_error,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ReinitRequest {
    model: Option<String>,
}

async fn reinit(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    // The body is optional; a bare POST re-probes with the configured order
    let request: ReinitRequest = serde_json::from_slice(&body).unwrap_or_default();
    let success = state.gateway.reinit(request.model.as_deref()).await;
    let snapshot = state.gateway.snapshot();

    let message = if success {
        "Gemini initialized successfully".to_string()
    } else {
        format!(
            "Gemini initialization failed: {}",
            snapshot.last_error.as_deref().unwrap_or("unknown error")
        )
    };

    Json(json!({
        "success": success,
        "chosenModel": snapshot.current_model,
        "lastError": snapshot.last_error,
        "message": message,
    }))
}

/// Operator diagnostic: one call through the SDK transport
async fn test_sdk(State(state): State<AppState>) -> Json<Value> {
    match state.gateway.sdk_probe().await {
        Ok((model, response)) => Json(json!({
            "success": true,
            "model": model,
            "response": response,
            "mode": "SDK",
        })),
        Err(e) => {
            let snapshot = state.gateway.snapshot();
            Json(json!({
                "success": false,
                "error": e.to_string(),
                "lastError": snapshot.last_error,
                "mode": "SDK",
            }))
        }
    }
}

/// Operator diagnostic: one call through the REST transport
async fn test_rest(State(state): State<AppState>) -> Json<Value> {
    match state.gateway.rest_probe().await {
        Ok(response) => Json(json!({
            "success": true,
            "response": response,
            "method": "REST",
        })),
        Err(e) => Json(json!({
            "success": false,
            "error": e.to_string(),
            "method": "REST",
        })),
    }
}

/// Operator diagnostic: raw vendor model listing
async fn models_raw(State(state): State<AppState>) -> Json<Value> {
    match state.gateway.models_raw().await {
        Ok(models) => Json(models),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}
