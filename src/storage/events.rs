//! Usage-event and search-query store
//!
//! Write paths are called through the fire-and-forget event sink; read paths
//! back the admin stats endpoints.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

use super::database::Database;
use crate::types::{Result, ResultExt, SearchSource};

/// Tool usage aggregate (chart-shaped: name/value)
#[derive(Debug, Clone, Serialize)]
pub struct ToolUsageRow {
    pub name: String,
    pub value: i64,
}

/// Search frequency aggregate
#[derive(Debug, Clone, Serialize)]
pub struct SearchCountRow {
    pub query: String,
    pub count: i64,
}

/// Per-tool search aggregate
#[derive(Debug, Clone, Serialize)]
pub struct ToolCountRow {
    pub tool: String,
    pub count: i64,
}

/// One day of a daily trend
#[derive(Debug, Clone, Serialize)]
pub struct TrendRow {
    pub date: String,
    pub count: i64,
}

impl Database {
    pub fn insert_usage_event(&self, user_id: Option<Uuid>, tool_name: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO usage_events (id, user_id, tool_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id.map(|u| u.to_string()),
                    tool_name,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context("Failed to insert usage event")?;
        Ok(())
    }

    /// Queries are normalized to trimmed lowercase before storage.
    pub fn insert_search_query(
        &self,
        query: &str,
        user_id: Option<Uuid>,
        tool_name: Option<&str>,
        source: SearchSource,
    ) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO search_queries (id, query, user_id, tool_name, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    query.trim().to_lowercase(),
                    user_id.map(|u| u.to_string()),
                    tool_name,
                    source.to_string(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context("Failed to insert search query")?;
        Ok(())
    }

    /// Most used tools since the cutoff, busiest first.
    pub fn top_tools(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<ToolUsageRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT tool_name, COUNT(*) AS uses FROM usage_events
                 WHERE created_at >= ?1
                 GROUP BY tool_name ORDER BY uses DESC LIMIT ?2",
            )
            .with_context("Failed to prepare tool usage query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339(), limit as i64], |row| {
                Ok(ToolUsageRow {
                    name: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Most frequent search queries since the cutoff.
    pub fn top_searches(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<SearchCountRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT query, COUNT(*) AS searches FROM search_queries
                 WHERE created_at >= ?1
                 GROUP BY query ORDER BY searches DESC LIMIT ?2",
            )
            .with_context("Failed to prepare top searches query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339(), limit as i64], |row| {
                Ok(SearchCountRow {
                    query: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Search counts grouped by originating tool (rows without a tool skipped).
    pub fn searches_by_tool(&self, since: DateTime<Utc>) -> Result<Vec<ToolCountRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT tool_name, COUNT(*) AS searches FROM search_queries
                 WHERE created_at >= ?1 AND tool_name IS NOT NULL
                 GROUP BY tool_name ORDER BY searches DESC",
            )
            .with_context("Failed to prepare searches-by-tool query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok(ToolCountRow {
                    tool: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Daily search counts since the cutoff, oldest day first.
    pub fn search_trend(&self, since: DateTime<Utc>) -> Result<Vec<TrendRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM search_queries
                 WHERE created_at >= ?1
                 GROUP BY day ORDER BY day ASC",
            )
            .with_context("Failed to prepare search trend query")?;

        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok(TrendRow {
                    date: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_searches_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM search_queries WHERE created_at >= ?1",
            params![since.to_rfc3339()],
            |row| row.get(0),
        )
        .with_context("Failed to count searches")
    }

    /// Events for the given tools, optionally bounded by a cutoff.
    pub fn count_tool_events(
        &self,
        tool_names: &[&str],
        since: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        if tool_names.is_empty() {
            return Ok(0);
        }

        let placeholders = tool_names
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT COUNT(*) FROM usage_events WHERE tool_name IN ({placeholders})");
        let since_str = since.map(|s| s.to_rfc3339());
        let mut params_vec: Vec<&dyn rusqlite::ToSql> = tool_names
            .iter()
            .map(|t| t as &dyn rusqlite::ToSql)
            .collect();
        if let Some(ref s) = since_str {
            sql.push_str(&format!(" AND created_at >= ?{}", params_vec.len() + 1));
            params_vec.push(s);
        }

        let conn = self.conn()?;
        conn.query_row(&sql, params_vec.as_slice(), |row| row.get(0))
            .with_context("Failed to count tool events")
    }

    /// Distinct users with any usage event since the cutoff.
    pub fn count_active_users(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM usage_events
             WHERE created_at >= ?1 AND user_id IS NOT NULL",
            params![since.to_rfc3339()],
            |row| row.get(0),
        )
        .with_context("Failed to count active users")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_usage_event_aggregation() {
        let db = test_db();
        db.insert_usage_event(None, "Content Gen").unwrap();
        db.insert_usage_event(None, "Content Gen").unwrap();
        db.insert_usage_event(None, "Grammar Check").unwrap();

        let since = Utc::now() - Duration::days(30);
        let top = db.top_tools(since, 10).unwrap();
        assert_eq!(top[0].name, "Content Gen");
        assert_eq!(top[0].value, 2);

        assert_eq!(
            db.count_tool_events(&["Content Gen", "Content Improve"], None)
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_search_query_normalization() {
        let db = test_db();
        db.insert_search_query("  Fix My Grammar  ", None, None, SearchSource::SearchBar)
            .unwrap();
        db.insert_search_query("fix my grammar", None, None, SearchSource::ToolUse)
            .unwrap();

        let since = Utc::now() - Duration::days(1);
        let top = db.top_searches(since, 5).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].query, "fix my grammar");
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn test_searches_by_tool_skips_null_tools() {
        let db = test_db();
        db.insert_search_query("a", None, Some("Tone"), SearchSource::ToolUse)
            .unwrap();
        db.insert_search_query("b", None, None, SearchSource::SearchBar)
            .unwrap();

        let since = Utc::now() - Duration::days(1);
        let by_tool = db.searches_by_tool(since).unwrap();
        assert_eq!(by_tool.len(), 1);
        assert_eq!(by_tool[0].tool, "Tone");
    }

    #[test]
    fn test_active_users_ignores_anonymous() {
        let db = test_db();
        let user = db
            .create_user("Ada", "ada@example.com", "h", crate::types::Role::User)
            .unwrap();
        db.insert_usage_event(Some(user.id), "Content Gen").unwrap();
        db.insert_usage_event(Some(user.id), "Content Gen").unwrap();
        db.insert_usage_event(None, "Content Gen").unwrap();

        let since = Utc::now() - Duration::days(30);
        assert_eq!(db.count_active_users(since).unwrap(), 1);
    }

    #[test]
    fn test_search_trend_groups_by_day() {
        let db = test_db();
        db.insert_search_query("q", None, None, SearchSource::SearchBar)
            .unwrap();
        db.insert_search_query("q2", None, None, SearchSource::SearchBar)
            .unwrap();

        let since = Utc::now() - Duration::days(1);
        let trend = db.search_trend(since).unwrap();
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].count, 2);
        // YYYY-MM-DD shape
        assert_eq!(trend[0].date.len(), 10);
    }
}
