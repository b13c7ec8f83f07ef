//! Fire-and-forget event emission
//!
//! Usage events and query logs are best-effort side channels: emit returns
//! immediately, failures are logged and swallowed, and no caller ever awaits
//! the write. The generation path must stay correct with a broken sink.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::storage::SharedDatabase;
use crate::types::SearchSource;

/// Shared sink handle for async contexts.
pub type SharedEventSink = Arc<dyn EventSink>;

/// Best-effort event recording. Implementations must not block the caller
/// and must not propagate failures.
pub trait EventSink: Send + Sync {
    /// Record one tool invocation
    fn log_usage(&self, user_id: Option<Uuid>, tool_name: &str);

    /// Record one query. Blank queries are dropped.
    fn log_search(
        &self,
        query: &str,
        user_id: Option<Uuid>,
        tool_name: Option<&str>,
        source: SearchSource,
    );
}

/// Sink that persists to the application database off the request path.
pub struct SqliteEventSink {
    db: SharedDatabase,
}

impl SqliteEventSink {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }
}

impl EventSink for SqliteEventSink {
    fn log_usage(&self, user_id: Option<Uuid>, tool_name: &str) {
        let db = Arc::clone(&self.db);
        let tool_name = tool_name.to_string();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = db.insert_usage_event(user_id, &tool_name) {
                warn!("Failed to log usage event: {}", e);
            }
        });
    }

    fn log_search(
        &self,
        query: &str,
        user_id: Option<Uuid>,
        tool_name: Option<&str>,
        source: SearchSource,
    ) {
        if query.trim().is_empty() {
            return;
        }

        let db = Arc::clone(&self.db);
        let query = query.to_string();
        let tool_name = tool_name.map(str::to_string);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = db.insert_search_query(&query, user_id, tool_name.as_deref(), source) {
                warn!("Failed to log search query: {}", e);
            }
        });
    }
}

/// Sink that drops everything. Used where no database is wired up.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn log_usage(&self, _user_id: Option<Uuid>, _tool_name: &str) {}

    fn log_search(
        &self,
        _query: &str,
        _user_id: Option<Uuid>,
        _tool_name: Option<&str>,
        _source: SearchSource,
    ) {
    }
}
