//! Cookie sessions
//!
//! In-memory session store keyed by an opaque UUID token carried in an
//! HttpOnly cookie, plus the extractors the handlers use to gate access.
//! Entries expire after the configured TTL and are reaped lazily on lookup.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use crate::types::{Role, ScribeError, User};

/// What a live session knows about its user
#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Concurrent in-memory session store
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionData>,
    ttl: Duration,
    cookie_name: String,
}

impl SessionStore {
    pub fn new(ttl_hours: u64, cookie_name: impl Into<String>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::hours(ttl_hours as i64),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Start a session and return its token
    pub fn create(&self, user_id: Uuid, role: Role) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            SessionData {
                user_id,
                role,
                created_at: Utc::now(),
            },
        );
        token
    }

    /// Look up a live session; expired entries are removed on sight
    pub fn get(&self, token: Uuid) -> Option<SessionData> {
        let data = self.sessions.get(&token)?.clone();
        if Utc::now() - data.created_at > self.ttl {
            self.sessions.remove(&token);
            return None;
        }
        Some(data)
    }

    pub fn destroy(&self, token: Uuid) {
        self.sessions.remove(&token);
    }

    /// Session cookie for a fresh token
    pub fn cookie(&self, token: Uuid) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token.to_string()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::hours(self.ttl.num_hours()))
            .build()
    }

    /// Expired cookie that clears the session on the client
    pub fn clear_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), String::new()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    }

    /// Token from the request's cookie jar, if it parses
    pub fn token_from_jar(&self, jar: &CookieJar) -> Option<Uuid> {
        jar.get(&self.cookie_name)
            .and_then(|c| Uuid::parse_str(c.value()).ok())
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// The session if one is present; never rejects
pub struct MaybeSession(pub Option<SessionData>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session = state
            .sessions
            .token_from_jar(&jar)
            .and_then(|token| state.sessions.get(token));
        Ok(MaybeSession(session))
    }
}

/// An authenticated user; rejects with 401
pub struct CurrentUser {
    pub user: User,
    pub token: Uuid,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = state
            .sessions
            .token_from_jar(&jar)
            .ok_or_else(|| ScribeError::Unauthorized("no session cookie".to_string()))?;
        let session = state
            .sessions
            .get(token)
            .ok_or_else(|| ScribeError::Unauthorized("session expired".to_string()))?;
        let user = state
            .db
            .find_user_by_id(session.user_id)?
            .ok_or_else(|| ScribeError::Unauthorized("session user gone".to_string()))?;

        Ok(CurrentUser { user, token })
    }
}

/// An authenticated admin; rejects with 401/403
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ScribeError::Forbidden("Admin access required".to_string()).into());
        }
        Ok(AdminUser(user))
    }
}
