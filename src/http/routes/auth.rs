//! Account registration, login, and session introspection

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::http::AppState;
use crate::http::error::ApiResult;
use crate::http::session::CurrentUser;
use crate::types::{Role, ScribeError, User};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| ScribeError::Storage(format!("hash task failed: {}", e)))?
        .map_err(|e| ScribeError::Storage(format!("password hashing failed: {}", e)).into())
}

async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
        .await
        .map_err(|e| ScribeError::Storage(format!("verify task failed: {}", e)))?
        .map_err(|e| ScribeError::Storage(format!("password verify failed: {}", e)).into())
}

fn session_response(state: &AppState, jar: CookieJar, user: &User) -> (CookieJar, serde_json::Value) {
    let token = state.sessions.create(user.id, user.role);
    let jar = jar.add(state.sessions.cookie(token));
    (jar, json!({ "success": true, "user": user.view() }))
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.name.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(ScribeError::invalid("Please provide all required fields").into());
    }

    let role = match request.role.as_deref() {
        Some(value) => value
            .parse::<Role>()
            .map_err(ScribeError::InvalidRequest)?,
        None => Role::User,
    };

    let hash = hash_password(request.password).await?;
    let user = state
        .db
        .create_user(request.name.trim(), &request.email, &hash, role)?;

    let (jar, body) = session_response(&state, jar, &user);
    Ok((StatusCode::CREATED, jar, Json(body)))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ScribeError::invalid("Please provide email and password").into());
    }

    let user = state.db.find_user_by_email(&request.email)?;
    let Some(user) = user else {
        return Err(ScribeError::Unauthorized("unknown email".to_string()).into());
    };

    if !verify_password(request.password, user.password_hash.clone()).await? {
        return Err(ScribeError::Unauthorized("bad password".to_string()).into());
    }

    let (jar, body) = session_response(&state, jar, &user);
    Ok((StatusCode::OK, jar, Json(body)))
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(token) = state.sessions.token_from_jar(&jar) {
        state.sessions.destroy(token);
    }
    let jar = jar.add(state.sessions.clear_cookie());
    (
        jar,
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
}

async fn me(current: CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "user": current.user.view() }))
}
