//! Router-level tests
//!
//! Drive the assembled axum router with in-memory state and fake generation
//! backends; assert on status codes and the JSON envelope the UI consumes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use scribeflow::ai::transport::SharedBackend;
use scribeflow::ai::{BackendResolver, GenerationGateway};
use scribeflow::http::session::SessionStore;
use scribeflow::types::Result as ScribeResult;
use scribeflow::types::ScribeError;
use scribeflow::{
    AppState, Config, Database, GenerationBackend, SharedEventSink, SqliteEventSink, router,
};

/// Backend that always answers with the same text, counting calls
struct FixedBackend {
    response: ScribeResult<String>,
    calls: AtomicUsize,
}

impl FixedBackend {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(ScribeError::vendor("any", message)),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for FixedBackend {
    async fn generate(&self, model: &str, _prompt: &str) -> ScribeResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(_) => Err(ScribeError::vendor(model, "scripted failure")),
        }
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Full state over an in-memory database and the given REST backend
fn test_state(rest: Option<Arc<FixedBackend>>) -> AppState {
    let db = Arc::new(Database::open_in_memory().unwrap());
    db.initialize().unwrap();

    let events: SharedEventSink = Arc::new(SqliteEventSink::new(Arc::clone(&db)));
    let resolver = Arc::new(BackendResolver::new(None, Duration::from_secs(1)));
    let gateway = Arc::new(GenerationGateway::new(
        resolver,
        rest.map(|b| b as SharedBackend),
        events.clone(),
        None,
        Duration::from_secs(1),
    ));

    AppState {
        config: Arc::new(Config::default()),
        db,
        gateway,
        sessions: Arc::new(SessionStore::new(24, "sid")),
        stripe: None,
        events,
    }
}

fn app(rest: Option<Arc<FixedBackend>>) -> Router {
    router(test_state(rest))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Generation endpoints
// =============================================================================

#[tokio::test]
async fn process_rejects_empty_prompt_without_backend_calls() {
    let rest = FixedBackend::ok("never used");
    let app = app(Some(rest.clone()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/ai/process",
            json!({ "prompt": "   ", "type": "generate" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(rest.call_count(), 0);
}

#[tokio::test]
async fn process_returns_rest_result() {
    let rest = FixedBackend::ok("Generated text");
    let app = app(Some(rest.clone()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/ai/process",
            json!({ "prompt": "write a poem", "type": "generate", "toolName": "Content Gen" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Generated text");
    assert_eq!(body["method"], "REST");
    assert_eq!(body["type"], "generate");
    assert_eq!(body["model"], "gemini-2.5-flash");
    assert_eq!(rest.call_count(), 1);
}

#[tokio::test]
async fn process_exhaustion_is_503_with_generic_message() {
    let rest = FixedBackend::failing("HTTP 500 from vendor");
    let app = app(Some(rest.clone()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/ai/process",
            json!({ "prompt": "write a poem" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    // Vendor text never reaches the client
    assert!(!body["message"].as_str().unwrap().contains("vendor"));
    // Every fallback candidate was tried exactly once
    assert_eq!(rest.call_count(), 4);
}

#[tokio::test]
async fn process_without_api_key_is_503_and_no_calls() {
    let app = app(None);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/ai/process",
            json!({ "prompt": "write a poem" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn status_reports_unconfigured_gateway() {
    let app = app(None);

    let response = app.oneshot(get_request("/api/ai/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["hasApiKey"], false);
    assert_eq!(body["sdkInitialized"], false);
    assert_eq!(body["initializationAttempted"], false);
}

#[tokio::test]
async fn reinit_without_key_reports_failure() {
    let app = app(None);

    let response = app
        .oneshot(json_request("POST", "/api/ai/reinit", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["lastError"], "GEMINI_API_KEY missing");
}

// =============================================================================
// Envelope / routing
// =============================================================================

#[tokio::test]
async fn unknown_route_returns_envelope_404() {
    let app = app(None);

    let response = app.oneshot(get_request("/api/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "API endpoint not found: GET /api/nope");
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let app = app(None);

    let response = app.oneshot(get_request("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Auth & sessions
// =============================================================================

/// Register a user and return the session cookie
async fn register(app: &Router, name: &str, email: &str, role: Option<&str>) -> String {
    let mut payload = json!({ "name": name, "email": email, "password": "hunter22" });
    if let Some(role) = role {
        payload["role"] = json!(role);
    }

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/register", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn register_login_me_round_trip() {
    let app = app(None);
    let cookie = register(&app, "Ada", "ada@example.com", None).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "ada@example.com");

    // Wrong password is rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "ada@example.com", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Right password works
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "ada@example.com", "password": "hunter22" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_is_conflict() {
    let app = app(None);
    register(&app, "Ada", "ada@example.com", None).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({ "name": "Other", "email": "ada@example.com", "password": "pw123456" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn me_without_session_is_401() {
    let app = app(None);

    let response = app.oneshot(get_request("/api/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Admin gates
// =============================================================================

#[tokio::test]
async fn admin_routes_enforce_role() {
    let app = app(None);

    // Anonymous: 401
    let response = app
        .clone()
        .oneshot(get_request("/api/admin/users"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Regular user: 403
    let user_cookie = register(&app, "User", "user@example.com", None).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/users")
                .header(header::COOKIE, &user_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin: 200 with the user list
    let admin_cookie = register(&app, "Admin", "admin@example.com", Some("admin")).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/users")
                .header(header::COOKIE, &admin_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn subscription_patch_validates_plan() {
    let app = app(None);
    let admin_cookie = register(&app, "Admin", "admin@example.com", Some("admin")).await;

    // Find the admin's own id through the listing
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/users")
                .header(header::COOKIE, &admin_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    let user_id = body["users"][0]["id"].as_str().unwrap().to_string();

    // Legacy variants are rejected on write
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/admin/users/{}/subscription", user_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &admin_cookie)
                .body(Body::from(json!({ "subscription": "yearly" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The constrained plan goes through
    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/admin/users/{}/subscription", user_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &admin_cookie)
                .body(Body::from(json!({ "subscription": "Premium" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["subscription"], "Premium");
}

#[tokio::test]
async fn dashboard_is_open_but_other_stats_are_gated() {
    let app = app(None);

    let response = app
        .clone()
        .oneshot(get_request("/api/admin/stats/dashboard"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stats"]["totalUsers"], 0);

    let response = app
        .oneshot(get_request("/api/admin/stats/overview"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Search / analytics writers
// =============================================================================

#[tokio::test]
async fn search_log_requires_query() {
    let app = app(None);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/search/log", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/search/log",
            json!({ "query": "grammar fixer", "source": "search_bar" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn track_usage_rejects_unknown_type() {
    let app = app(None);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/analytics/track-usage",
            json!({ "type": "pageview", "data": {} }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/analytics/track-usage",
            json!({
                "type": "session",
                "data": { "sessionId": "abc", "device": "desktop", "duration": 120 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn feedback_requires_fields_and_stores() {
    let app = app(None);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/analytics/feedback",
            json!({ "type": "rating" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/analytics/feedback",
            json!({
                "type": "rating",
                "rating": 5,
                "subject": "Great tool",
                "message": "Saves me an hour a day",
                "feature": "Grammar"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["feedbackId"].as_str().is_some());
}

// =============================================================================
// Payments
// =============================================================================

#[tokio::test]
async fn payment_intent_requires_auth_and_stripe() {
    let app = app(None);

    // Anonymous: 401
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/payment/create-payment-intent",
            json!({ "amount": 9.99 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Authenticated but Stripe unconfigured: 502
    let cookie = register(&app, "Ada", "ada@example.com", None).await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payment/create-payment-intent")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookie)
                .body(Body::from(json!({ "amount": 9.99 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn payments_alias_route_matches() {
    let app = app(None);

    let response = app
        .oneshot(get_request("/api/payments/config"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}
