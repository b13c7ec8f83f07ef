//! HTTP surface
//!
//! Router assembly, shared state, CORS, and the serve loop. Every route
//! group lives in `routes/`; auth gates are extractors in `session.rs`.

pub mod error;
pub mod routes;
pub mod session;

pub use error::{ApiError, ApiResult};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::ai::GenerationGateway;
use crate::billing::StripeClient;
use crate::config::Config;
use crate::events::{SharedEventSink, SqliteEventSink};
use crate::storage::SharedDatabase;
use crate::types::Result;
use session::SessionStore;

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: SharedDatabase,
    pub gateway: Arc<GenerationGateway>,
    pub sessions: Arc<SessionStore>,
    pub stripe: Option<Arc<StripeClient>>,
    pub events: SharedEventSink,
}

impl AppState {
    /// Wire up the full production state from config and an opened database.
    pub fn new(config: Config, db: SharedDatabase) -> Result<Self> {
        let events: SharedEventSink = Arc::new(SqliteEventSink::new(Arc::clone(&db)));
        let gateway = Arc::new(GenerationGateway::from_config(&config.generation, events.clone())?);
        let sessions = Arc::new(SessionStore::new(
            config.session.ttl_hours,
            config.session.cookie_name.clone(),
        ));

        let stripe = match config.stripe.usable_secret_key() {
            Some(key) => {
                info!("Stripe initialized");
                Some(Arc::new(StripeClient::new(
                    key.to_string(),
                    None,
                    Duration::from_secs(30),
                )?))
            }
            None => {
                warn!("Stripe disabled: STRIPE_SECRET_KEY missing or invalid");
                None
            }
        };

        Ok(Self {
            config: Arc::new(config),
            db,
            gateway,
            sessions,
            stripe,
            events,
        })
    }
}

/// Assemble the application router with middleware attached.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/ai", routes::ai::router())
        .nest("/api/auth", routes::auth::router())
        .nest("/api/admin/stats", routes::stats::router())
        .nest("/api/admin/users", routes::users::router())
        .nest("/api/search", routes::search::router())
        .nest("/api/payment", routes::payments::router())
        .nest("/api/payments", routes::payments::router())
        .nest("/api/analytics", routes::analytics::router())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "cors": "enabled",
    }))
}

async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("API endpoint not found: {} {}", method, uri.path()),
        })),
    )
}

/// Bind and serve until shutdown. Startup also kicks off the initial SDK
/// probe so the first request does not pay the binding cost.
pub async fn serve(state: AppState) -> Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    )
    .parse()
    .map_err(|e| crate::types::ScribeError::Config(format!("invalid bind address: {}", e)))?;

    // Startup probe, same as an explicit reinit
    let gateway = Arc::clone(&state.gateway);
    tokio::spawn(async move {
        info!("Starting Gemini initialization...");
        if gateway.reinit(None).await {
            info!(
                model = ?gateway.resolver().bound_model(),
                "Gemini SDK initialized"
            );
        } else {
            warn!(
                error = ?gateway.resolver().last_error(),
                "Gemini SDK not available - REST fallback mode"
            );
        }
    });

    let app = router(state);

    info!(%addr, "API server listening");
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => warn!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
